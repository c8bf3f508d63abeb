//! Supabase Auth implementation of [`SessionStore`].
//!
//! Each call reads the session cookies, rotates the token pair through
//! `POST /auth/v1/token?grant_type=refresh_token` when the access token is at or near
//! expiry, and otherwise validates the access token with `GET /auth/v1/user`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use storefront_admin::services::{CookieOptions, SupabaseSessionStore};
//!
//! let store = SupabaseSessionStore::new(
//!     reqwest::Client::new(),
//!     "https://project.supabase.co",
//!     "public-anon-key",
//! )
//! .with_cookie_options(CookieOptions { secure: false, ..Default::default() })
//! .with_refresh_margin(Duration::from_secs(90));
//! ```

use std::time::Duration;

use actix_web::cookie::Cookie;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};

use crate::{
    data::{AuthResponse, SupabaseErrorResponse, User},
    services::session::{
        ACCESS_TOKEN_COOKIE, CookieOptions, EXPIRES_AT_COOKIE, Principal, REFRESH_TOKEN_COOKIE,
        SessionError, SessionRefresh, SessionStore, cookie_value,
    },
};

/// Default window before expiry in which the access token is rotated.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(90);

enum RefreshOutcome {
    Rotated(AuthResponse),
    /// The refresh token was revoked, reused, or expired.
    Rejected,
}

/// Session store backed by the Supabase Auth REST API.
#[derive(Debug, Clone)]
pub struct SupabaseSessionStore {
    client: Client,
    url: String,
    anon_key: String,
    cookies: CookieOptions,
    refresh_margin: Duration,
}

impl SupabaseSessionStore {
    pub fn new(client: Client, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            cookies: CookieOptions::default(),
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }

    pub fn with_cookie_options(mut self, cookies: CookieOptions) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Exchanges a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, SessionError> {
        tracing::debug!("Rotating session tokens with Supabase");

        let res = self
            .client
            .post(format!("{}/auth/v1/token?grant_type=refresh_token", self.url))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status.is_success() {
            let grant = serde_json::from_str::<AuthResponse>(&body)
                .map_err(|e| SessionError::Parse(e.to_string()))?;
            tracing::info!(user_id = %grant.user.id, "Session tokens rotated");
            return Ok(RefreshOutcome::Rotated(grant));
        }

        // 429 means the token may still be good; only a definite rejection ends the session.
        if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                status_code = %status.as_u16(),
                reason = %error_message(&body),
                "Supabase rejected refresh token"
            );
            return Ok(RefreshOutcome::Rejected);
        }

        Err(SessionError::Supabase {
            status: status.as_u16(),
            msg: error_message(&body),
        })
    }

    /// Validates an access token; `Ok(None)` when Supabase refuses it.
    async fn fetch_user(&self, access_token: &str) -> Result<Option<User>, SessionError> {
        let res = self
            .client
            .get(format!("{}/auth/v1/user", self.url))
            .bearer_auth(access_token)
            .header("apikey", &self.anon_key)
            .send()
            .await?;

        let status = res.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            tracing::debug!(status_code = %status.as_u16(), "Supabase rejected access token");
            return Ok(None);
        }

        let body = res.text().await?;
        if !status.is_success() {
            return Err(SessionError::Supabase {
                status: status.as_u16(),
                msg: error_message(&body),
            });
        }

        serde_json::from_str::<User>(&body)
            .map(Some)
            .map_err(|e| SessionError::Parse(e.to_string()))
    }

    async fn rotate(&self, refresh_token: &str, now: i64) -> Result<SessionRefresh, SessionError> {
        Ok(match self.refresh(refresh_token).await? {
            RefreshOutcome::Rotated(grant) => {
                SessionRefresh::authenticated(principal_from(&grant.user), self.rotated_cookies(&grant, now))
            }
            RefreshOutcome::Rejected => SessionRefresh {
                principal: None,
                cookies: self.cookies.clear_session(),
            },
        })
    }

    fn rotated_cookies(&self, grant: &AuthResponse, now: i64) -> Vec<Cookie<'static>> {
        vec![
            self.cookies.cookie(ACCESS_TOKEN_COOKIE, grant.access_token.clone()),
            self.cookies.cookie(REFRESH_TOKEN_COOKIE, grant.refresh_token.clone()),
            self.cookies.cookie(EXPIRES_AT_COOKIE, grant.expiry(now).to_string()),
        ]
    }
}

#[async_trait]
impl SessionStore for SupabaseSessionStore {
    async fn current_user(&self, cookies: &[Cookie<'static>]) -> Result<SessionRefresh, SessionError> {
        let access_token = cookie_value(cookies, ACCESS_TOKEN_COOKIE);
        let refresh_token = cookie_value(cookies, REFRESH_TOKEN_COOKIE);

        if access_token.is_none() && refresh_token.is_none() {
            return Ok(SessionRefresh::anonymous());
        }

        let expires_at = cookie_value(cookies, EXPIRES_AT_COOKIE).and_then(|v| v.parse::<i64>().ok());
        let now = Utc::now().timestamp();
        let margin = i64::try_from(self.refresh_margin.as_secs()).unwrap_or(i64::MAX);

        let due = needs_refresh(access_token.is_some(), expires_at, now, margin);
        if let Some(refresh_token) = refresh_token.filter(|_| due) {
            return self.rotate(refresh_token, now).await;
        }

        let Some(access_token) = access_token else {
            return Ok(SessionRefresh::anonymous());
        };

        match self.fetch_user(access_token).await? {
            Some(user) => Ok(SessionRefresh::authenticated(principal_from(&user), Vec::new())),
            // The expiry cookie can be stale or skewed; the refresh token decides.
            None => match refresh_token {
                Some(refresh_token) => {
                    tracing::debug!("Access token refused before its recorded expiry");
                    self.rotate(refresh_token, now).await
                }
                None => Ok(SessionRefresh::anonymous()),
            },
        }
    }
}

fn principal_from(user: &User) -> Principal {
    Principal {
        id: user.id,
        email: user.email.clone(),
    }
}

/// Whether the access token should be rotated before use.
///
/// A missing access token or unknown expiry always triggers a rotation.
pub(crate) fn needs_refresh(has_access: bool, expires_at: Option<i64>, now: i64, margin: i64) -> bool {
    if !has_access {
        return true;
    }
    match expires_at {
        Some(exp) => exp.saturating_sub(now) <= margin,
        None => true,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<SupabaseErrorResponse>(body)
        .ok()
        .and_then(|e| e.msg)
        .unwrap_or_else(|| body.chars().take(200).collect())
}
