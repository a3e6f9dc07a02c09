use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::features::users::models::User;

#[derive(Debug, Error)]
pub enum UserLookupError {
    #[error("user not found: {0}")]
    NotFound(Uuid),

    #[error("user lookup failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read-only access to the accounts owned by the user service
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<User, UserLookupError>;

    /// Resolve many users in one round trip. Unknown ids are simply absent
    /// from the result; duplicates in `ids` are allowed.
    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>, UserLookupError>;
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, id: Uuid) -> Result<User, UserLookupError> {
        sqlx::query_as::<_, User>("SELECT id, name, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(UserLookupError::NotFound(id))
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>, UserLookupError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>("SELECT id, name, role FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }
}
