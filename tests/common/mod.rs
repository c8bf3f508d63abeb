//! Fake collaborators for driving the route gate without Supabase or Postgres.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::cookie::Cookie;
use async_trait::async_trait;
use storefront_admin::{
    data::Role,
    services::{
        CookieOptions, Principal, RoleError, RoleStore, SessionError, SessionRefresh,
        SessionStore, cookie_value,
        session::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    },
};
use uuid::Uuid;

pub const ROTATED_ACCESS: &str = "rotated-access";
pub const ROTATED_REFRESH: &str = "rotated-refresh";

pub fn principal() -> Principal {
    Principal {
        id: Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap(),
        email: Some("owner@shop.example".to_string()),
    }
}

/// Authenticates any request carrying a session cookie.
#[derive(Default)]
pub struct FakeSessions {
    pub principal: Option<Principal>,
    pub rotate: bool,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeSessions {
    pub fn signed_in() -> Self {
        Self {
            principal: Some(principal()),
            ..Default::default()
        }
    }

    pub fn rotating() -> Self {
        Self {
            rotate: true,
            ..Self::signed_in()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::signed_in()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for FakeSessions {
    async fn current_user(&self, cookies: &[Cookie<'static>]) -> Result<SessionRefresh, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SessionError::Supabase {
                status: 503,
                msg: "auth service unavailable".to_string(),
            });
        }
        if cookie_value(cookies, ACCESS_TOKEN_COOKIE).is_none()
            && cookie_value(cookies, REFRESH_TOKEN_COOKIE).is_none()
        {
            return Ok(SessionRefresh::anonymous());
        }

        let options = CookieOptions::default();
        let rotated = if self.rotate {
            vec![
                options.cookie(ACCESS_TOKEN_COOKIE, ROTATED_ACCESS),
                options.cookie(REFRESH_TOKEN_COOKIE, ROTATED_REFRESH),
            ]
        } else {
            Vec::new()
        };

        Ok(SessionRefresh {
            principal: self.principal.clone(),
            cookies: rotated,
        })
    }
}

pub enum RoleAnswer {
    Found(Role),
    Missing,
    Fail,
}

pub struct FakeRoles {
    pub answer: RoleAnswer,
    pub calls: AtomicUsize,
}

impl FakeRoles {
    pub fn new(answer: RoleAnswer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn admin() -> Self {
        Self::new(RoleAnswer::Found(Role::Admin))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoleStore for FakeRoles {
    async fn role_of(&self, _principal_id: Uuid) -> Result<Option<Role>, RoleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answer {
            RoleAnswer::Found(role) => Ok(Some(role)),
            RoleAnswer::Missing => Ok(None),
            RoleAnswer::Fail => Err(RoleError::Database(sqlx::Error::PoolTimedOut)),
        }
    }
}

/// Cookie header for a signed-in browser with a stale access token.
pub fn session_cookie_header() -> (&'static str, &'static str) {
    ("Cookie", "sb-access-token=old-access; sb-refresh-token=old-refresh; theme=dark")
}
