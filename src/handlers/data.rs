//! Supabase auth payloads and the dashboard role model.
//!
//! The structures here mirror the subset of the Supabase Auth (GoTrue) responses the
//! admin backend actually reads: the token grant returned by a refresh, and the user
//! object returned by `/auth/v1/user`. Unknown fields are ignored so upstream additions
//! never break deserialization.
//!
//! # Examples
//!
//! ```json
//! {
//!   "access_token": "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...",
//!   "token_type": "bearer",
//!   "expires_in": 3600,
//!   "expires_at": 1234567890,
//!   "refresh_token": "v1.M2YwOTQxNzktZGYwNi00...",
//!   "user": { "id": "…", "email": "owner@shop.example" }
//! }
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token grant returned by `POST /auth/v1/token`.
///
/// # Token Expiration
///
/// Older GoTrue deployments omit `expires_at`; callers fall back to
/// `now + expires_in` in that case (see [`AuthResponse::expiry`]).
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// JWT access token for API authentication
    pub access_token: String,

    /// Token type, typically "bearer"
    #[serde(default)]
    pub token_type: String,

    /// Number of seconds until the access token expires
    pub expires_in: i64,

    /// Unix timestamp indicating when the access token expires
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// Rotated refresh token. Supabase issues a new one on every refresh and
    /// invalidates the previous one after a short reuse window.
    pub refresh_token: String,

    pub user: User,
}

impl AuthResponse {
    /// Absolute expiry of the access token in unix seconds.
    pub fn expiry(&self, now: i64) -> i64 {
        self.expires_at.unwrap_or(now + self.expires_in)
    }
}

/// User object returned by `GET /auth/v1/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier, the primary key across all Supabase services
    pub id: Uuid,

    /// Email may be absent for phone-only or anonymous accounts
    #[serde(default)]
    pub email: Option<String>,

    /// Database role ("authenticated"), unrelated to the dashboard [`Role`]
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub is_anonymous: bool,
}

/// Dashboard roles stored in the `users.role` column.
///
/// Adding a variant forces every exhaustive match, including [`Role::is_admin`],
/// to be revisited.
///
/// Serialized to lowercase strings:
/// - `Customer` → `"customer"`
/// - `Admin` → `"admin"`
/// - `Seller` → `"seller"`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Shopper account; no dashboard access
    Customer,

    /// Store administrator; the only role admitted to protected pages
    Admin,

    /// Marketplace seller; no dashboard access yet
    Seller,
}

impl Role {
    /// The single authorization predicate used by the route gate.
    ///
    /// ```rust
    /// use storefront_admin::handlers::data::Role;
    ///
    /// assert!(Role::Admin.is_admin());
    /// assert!(!Role::Seller.is_admin());
    /// ```
    pub fn is_admin(self) -> bool {
        match self {
            Role::Admin => true,
            Role::Customer | Role::Seller => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Seller => "seller",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that does not name any [`Role`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Parses a stored role value.
    ///
    /// Unrecognized values are rejected; the role store reports them as errors.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            "seller" => Ok(Self::Seller),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Error body returned by Supabase Auth on non-2xx responses.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SupabaseErrorResponse {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default, alias = "error_description")]
    pub msg: Option<String>,
}
