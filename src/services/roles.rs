//! Role lookup for authenticated principals.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::data::{Role, UnknownRole};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("role lookup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Unknown(#[from] UnknownRole),
}

/// Keyed lookup of a principal's dashboard role.
///
/// `Ok(None)` means the principal has no role record.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn role_of(&self, principal_id: Uuid) -> Result<Option<Role>, RoleError>;
}

/// Reads roles from the `users` table in the Supabase Postgres database.
#[derive(Debug, Clone)]
pub struct PgRoleStore {
    db: Arc<PgPool>,
}

impl PgRoleStore {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    #[tracing::instrument(skip(self))]
    async fn role_of(&self, principal_id: Uuid) -> Result<Option<Role>, RoleError> {
        // `role` may be a Postgres enum, so compare as text
        let role = sqlx::query_scalar::<_, String>("SELECT role::text FROM users WHERE id = $1")
            .bind(principal_id)
            .fetch_optional(self.db.as_ref())
            .await?;

        match role {
            Some(value) => Ok(Some(value.parse::<Role>()?)),
            None => {
                tracing::debug!("No role record for principal");
                Ok(None)
            }
        }
    }
}
