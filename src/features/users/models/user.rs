use sqlx::FromRow;
use uuid::Uuid;

/// Report owner as seen by the report service
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: String,
}
