//! Shared application state and environment configuration.

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::PgPool;

use crate::{
    db,
    gate::GateConfig,
    services::{
        CookieOptions, PgRoleStore, RoleStore, SessionStore, SupabaseSessionStore,
        supabase::DEFAULT_REFRESH_MARGIN,
    },
};

/// Shared application state for the server and its middleware.
///
/// Holds the Postgres pool, Supabase credentials and the route gate settings.
#[derive(Clone)]
pub struct AppState {
    /// SQLx Postgres connection pool, used for role lookups
    pub db: Arc<PgPool>,
    /// Supabase REST API URL
    pub supabase_url: String,
    /// Supabase anon key, sent as `apikey` on auth calls
    pub supabase_anon_key: String,
    /// Attributes for session cookies written after a token rotation
    pub cookie_options: CookieOptions,
    /// How long before expiry an access token is rotated
    pub refresh_margin: Duration,
    /// Public allow-list and redirect targets
    pub gate: GateConfig,
    /// Address the HTTP server binds to
    pub bind_address: String,
    http: reqwest::Client,
}

impl AppState {
    /// Builds the application state from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `SUPABASE_URL`: Base URL for the Supabase project
    /// - `SUPABASE_ANON_KEY`: Anonymous key for auth requests
    /// - `DATABASE_URL`: Postgres connection string for the role lookup
    ///
    /// Optional:
    /// - `BIND_ADDRESS` (default `127.0.0.1:8080`)
    /// - `COOKIE_SECURE` (default `true`)
    /// - `SESSION_REFRESH_MARGIN`, e.g. `90s` or `2m` (default 90 seconds)
    /// - `PUBLIC_ROUTES`, comma separated (default `/login,/setup-admin,/register`)
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value does not parse.
    pub fn new() -> anyhow::Result<Self> {
        let supabase_url = required("SUPABASE_URL")?;
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;
        let db = db::connect_pg_pool(&required("DATABASE_URL")?)?;

        let cookie_options = CookieOptions {
            secure: optional("COOKIE_SECURE")
                .map(|v| parse_bool(&v))
                .transpose()?
                .unwrap_or(true),
            ..CookieOptions::default()
        };

        let refresh_margin = optional("SESSION_REFRESH_MARGIN")
            .map(|v| humantime::parse_duration(&v).context("invalid SESSION_REFRESH_MARGIN"))
            .transpose()?
            .unwrap_or(DEFAULT_REFRESH_MARGIN);

        let gate = GateConfig::from_env()?;
        if gate.is_public("/setup-admin") {
            tracing::warn!(
                public_routes = ?gate.public_routes,
                "/setup-admin is reachable without authentication; remove it from PUBLIC_ROUTES once the first admin exists"
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            db: Arc::new(db),
            supabase_url,
            supabase_anon_key,
            cookie_options,
            refresh_margin,
            gate,
            bind_address: optional("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            http,
        })
    }

    /// Session store talking to Supabase Auth with this state's settings.
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        Arc::new(
            SupabaseSessionStore::new(
                self.http.clone(),
                self.supabase_url.clone(),
                self.supabase_anon_key.clone(),
            )
            .with_cookie_options(self.cookie_options)
            .with_refresh_margin(self.refresh_margin),
        )
    }

    /// Role store reading the `users` table through the shared pool.
    pub fn role_store(&self) -> Arc<dyn RoleStore> {
        Arc::new(PgRoleStore::new(self.db.clone()))
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{other}`"),
    }
}
