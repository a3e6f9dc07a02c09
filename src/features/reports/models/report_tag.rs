use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Classification bucket shared by every report with the same class and location
#[derive(Debug, Clone, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub location: String,
    pub class: String,
    pub report_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
