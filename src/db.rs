//! Database connection utilities for the admin backend.
//!
//! Provides a function to create a connection pool to the Supabase Postgres database.

use std::time::Duration;

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};

/// Creates a lazily connecting pool for `database_url`.
///
/// Connections are opened on first use, so a database outage surfaces as a role
/// lookup failure (and therefore a denied request) rather than a startup crash.
///
/// # Errors
/// Returns an error if `database_url` is not a valid Postgres connection string.
pub fn connect_pg_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
        .context("invalid DATABASE_URL")
}
