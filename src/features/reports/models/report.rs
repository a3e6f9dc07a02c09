use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Report status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Unverified,
    Verified,
    Rejected,
    Handled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid report status: {0}")]
pub struct ParseReportStatusError(pub String);

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Unverified,
        ReportStatus::Verified,
        ReportStatus::Rejected,
        ReportStatus::Handled,
        ReportStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Unverified => "unverified",
            ReportStatus::Verified => "verified",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Handled => "handled",
            ReportStatus::Completed => "completed",
        }
    }

    /// Review lifecycle edges. Staying in the same status is always allowed.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        use ReportStatus::*;

        self == next
            || matches!(
                (self, next),
                (Unverified, Verified)
                    | (Unverified, Rejected)
                    | (Verified, Handled)
                    | (Handled, Completed)
            )
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ParseReportStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseReportStatusError(s.to_string()))
    }
}

/// Database model for report
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub text: String,
    /// Storage path relative to the storage root, empty when no image was sent
    pub image: String,
    pub status: ReportStatus,
    pub pred_confidence: Option<i32>,
    pub upvotes: i32,
    pub share_count: i32,
    pub location: String,
    pub user_id: Uuid,
    pub tag_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new report
#[derive(Debug, Clone)]
pub struct NewReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub image: String,
    pub location: String,
}

/// Automated classification result for a report
#[derive(Debug, Clone)]
pub struct ReportInference {
    pub report_id: Uuid,
    pub class: String,
    /// Empty means "use the report's own location"
    pub location: String,
    pub confidence: Option<i32>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub status: ReportStatus,
    pub count: i64,
}
