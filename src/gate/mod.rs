//! Request-time authentication and authorization gate.
//!
//! # Overview
//! [`evaluate`] decides, for a single request, whether the caller proceeds or is
//! redirected. It runs in a fixed order:
//!
//! 1. resolve the session (rotating tokens when needed) through a [`SessionStore`],
//! 2. classify the path as public or protected,
//! 3. branch on authentication, looking up the role only for authenticated callers
//!    on protected paths.
//!
//! Every collaborator failure fails closed: a session error means anonymous, a role
//! error means unauthorized. Cookies produced by step 1 are returned alongside the
//! decision whatever it is, and the HTTP middleware in
//! [`crate::auth_middleware`] writes them onto the final response.
//!
//! | session | path      | role          | decision          |
//! |---------|-----------|---------------|-------------------|
//! | none    | public    | -             | [`Decision::Allow`]        |
//! | none    | protected | -             | [`Decision::SignIn`]       |
//! | some    | public    | -             | [`Decision::Landing`]      |
//! | some    | protected | admin         | [`Decision::Allow`]        |
//! | some    | protected | other/none/err| [`Decision::Unauthorized`] |

pub mod routes;

use std::env;

use actix_web::cookie::Cookie;

use crate::services::{Principal, RoleStore, SessionRefresh, SessionStore};

/// Where the gate sends callers, and which paths skip authentication.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Normalized public route prefixes
    pub public_routes: Vec<String>,
    /// Sign-in page, target of every denial
    pub login_path: String,
    /// Default page for signed-in callers hitting a public route
    pub landing_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            public_routes: routes::DEFAULT_PUBLIC_ROUTES
                .iter()
                .map(|r| r.to_string())
                .collect(),
            login_path: "/login".to_string(),
            landing_path: "/dashboard".to_string(),
        }
    }
}

impl GateConfig {
    /// Builds the gate configuration, honoring `PUBLIC_ROUTES` (comma separated) when set.
    ///
    /// # Errors
    ///
    /// Fails when the resulting allow-list does not cover the login page, which would
    /// make every denial redirect in a loop.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = match env::var("PUBLIC_ROUTES") {
            Ok(list) => Self::default().with_public_routes(list.split(',')),
            Err(_) => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replaces the allow-list. Entries are normalized; blank entries and `/` are dropped.
    pub fn with_public_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.public_routes = routes
            .into_iter()
            .filter_map(|r| routes::normalize_route(r.as_ref()))
            .collect();
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.is_public(&self.login_path) {
            anyhow::bail!(
                "public routes {:?} must include the login page {}",
                self.public_routes,
                self.login_path
            );
        }
        if self.is_public(&self.landing_path) {
            anyhow::bail!("landing page {} must not be public", self.landing_path);
        }
        Ok(())
    }

    pub fn is_public(&self, path: &str) -> bool {
        routes::is_public(path, &self.public_routes)
    }
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Continue to the handler.
    Allow,
    /// No session on a protected path; come back to `return_to` after signing in.
    SignIn { return_to: String },
    /// Signed in without the admin role.
    Unauthorized,
    /// Signed in and visiting a public page such as `/login`.
    Landing,
}

impl Decision {
    /// Redirect target, or `None` for [`Decision::Allow`].
    ///
    /// ```rust
    /// use storefront_admin::gate::{Decision, GateConfig};
    ///
    /// let config = GateConfig::default();
    /// let decision = Decision::SignIn { return_to: "/orders/42".into() };
    /// assert_eq!(
    ///     decision.location(&config).as_deref(),
    ///     Some("/login?redirect=%2Forders%2F42"),
    /// );
    /// ```
    pub fn location(&self, config: &GateConfig) -> Option<String> {
        match self {
            Decision::Allow => None,
            Decision::SignIn { return_to } => Some(format!(
                "{}?redirect={}",
                config.login_path,
                urlencoding::encode(return_to)
            )),
            Decision::Unauthorized => Some(format!("{}?error=unauthorized", config.login_path)),
            Decision::Landing => Some(config.landing_path.clone()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::SignIn { .. } => "sign_in",
            Decision::Unauthorized => "unauthorized",
            Decision::Landing => "landing",
        }
    }
}

/// Decision plus everything the middleware needs to apply it.
#[derive(Debug)]
pub struct GateOutcome {
    pub decision: Decision,
    pub principal: Option<Principal>,
    /// Cookies changed by the session store; set on the response in every case.
    pub cookies: Vec<Cookie<'static>>,
}

/// Runs the gate for `path` with the request's `cookies`.
///
/// Never fails: collaborator errors are logged and resolved into a redirect.
pub async fn evaluate(
    path: &str,
    cookies: &[Cookie<'static>],
    config: &GateConfig,
    sessions: &dyn SessionStore,
    roles: &dyn RoleStore,
) -> GateOutcome {
    let SessionRefresh { principal, cookies } = match sessions.current_user(cookies).await {
        Ok(refresh) => refresh,
        Err(e) => {
            tracing::warn!(error = %e, "Session refresh failed, treating caller as anonymous");
            SessionRefresh::anonymous()
        }
    };

    let public = config.is_public(path);

    let decision = match (&principal, public) {
        (None, true) => Decision::Allow,
        (None, false) => Decision::SignIn {
            return_to: bare_path(path),
        },
        (Some(_), true) => Decision::Landing,
        (Some(principal), false) => match roles.role_of(principal.id).await {
            Ok(Some(role)) if role.is_admin() => Decision::Allow,
            Ok(Some(role)) => {
                tracing::info!(user_id = %principal.id, role = %role, "Non-admin denied");
                Decision::Unauthorized
            }
            Ok(None) => {
                tracing::info!(user_id = %principal.id, "Principal without role record denied");
                Decision::Unauthorized
            }
            Err(e) => {
                tracing::error!(user_id = %principal.id, error = %e, "Role lookup failed");
                Decision::Unauthorized
            }
        },
    };

    GateOutcome {
        decision,
        principal,
        cookies,
    }
}

fn bare_path(path: &str) -> String {
    path.split(['?', '#']).next().unwrap_or_default().to_string()
}
