//! Session store contract used by the route gate.
//!
//! A session lives in three cookies written by the sign-in flow: the access token,
//! the refresh token, and the access token's expiry in unix seconds. A
//! [`SessionStore`] resolves the current [`Principal`] from those cookies and, when it
//! rotates the tokens, hands back the cookies to set instead of writing them to a
//! response itself. The gate decides which response they end up on.

use actix_web::cookie::{Cookie, SameSite};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";
pub const EXPIRES_AT_COOKIE: &str = "sb-expires-at";

/// Every cookie that makes up a session, in write order.
pub const SESSION_COOKIES: [&str; 3] = [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, EXPIRES_AT_COOKIE];

/// Authenticated identity resolved from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Supabase user id, also the primary key of the `users` table
    pub id: Uuid,
    pub email: Option<String>,
}

/// Result of resolving the current user.
///
/// `cookies` holds every cookie the store changed (rotated or cleared) and must be
/// mirrored onto whatever response is finally returned.
#[derive(Debug, Default)]
pub struct SessionRefresh {
    pub principal: Option<Principal>,
    pub cookies: Vec<Cookie<'static>>,
}

impl SessionRefresh {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(principal: Principal, cookies: Vec<Cookie<'static>>) -> Self {
        Self {
            principal: Some(principal),
            cookies,
        }
    }
}

/// Failures talking to the session backend.
///
/// The gate never surfaces these; they are logged and the caller is treated as
/// anonymous.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Supabase error {status}: {msg}")]
    Supabase { status: u16, msg: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Resolves the signed-in user from request cookies, rotating tokens when needed.
///
/// Implementations must be cheap enough to run on every gated request.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn current_user(&self, cookies: &[Cookie<'static>]) -> Result<SessionRefresh, SessionError>;
}

/// Attributes applied to every session cookie the backend writes.
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub max_age: time::Duration,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            secure: true,
            max_age: time::Duration::days(400),
        }
    }
}

impl CookieOptions {
    /// Builds a session cookie. Not `HttpOnly`: the browser-side Supabase client
    /// reads the same cookies.
    pub fn cookie(&self, name: &'static str, value: impl Into<String>) -> Cookie<'static> {
        Cookie::build(name, value.into())
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(self.max_age)
            .finish()
    }

    /// Builds a cookie that deletes `name` on the client.
    pub fn removal(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.cookie(name, "");
        cookie.make_removal();
        cookie
    }

    /// Removal cookies for the whole session.
    pub fn clear_session(&self) -> Vec<Cookie<'static>> {
        SESSION_COOKIES.into_iter().map(|name| self.removal(name)).collect()
    }
}

/// Returns the value of a non-empty cookie named `name`.
pub fn cookie_value<'a>(cookies: &'a [Cookie<'static>], name: &str) -> Option<&'a str> {
    cookies
        .iter()
        .find(|c| c.name() == name)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
}
