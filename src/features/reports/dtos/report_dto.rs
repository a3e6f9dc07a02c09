use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::models::{Report, ReportStatus, StatusCount, Tag};

/// Create report request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateReportFormDto {
    /// Report description; may be empty when an image is attached
    #[schema(example = "Jalan berlubang di depan sekolah")]
    pub text: Option<String>,
    /// Free-form location
    #[schema(example = "Jl. Merdeka No. 10, Bandung")]
    pub location: Option<String>,
    /// Photo of the incident (jpeg, png, gif, webp, bmp or tiff, max 10 MiB)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: Option<String>,
}

/// Response DTO for a freshly created report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateReportResponseDto {
    pub id: Uuid,
    pub text: String,
    /// Storage path of the image, empty when none was attached
    pub image: String,
    pub location: String,
}

impl From<Report> for CreateReportResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            text: r.text,
            image: r.image,
            location: r.location,
        }
    }
}

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: Uuid,
    pub text: String,
    pub image: String,
    pub location: String,
    pub status: ReportStatus,
    pub upvotes: i32,
    pub share_count: i32,
    pub pred_confidence: Option<i32>,
    pub tag_id: Option<Uuid>,
    pub user_id: Uuid,
    /// Display name of the report owner
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReportResponseDto {
    pub fn from_report(r: Report, username: String) -> Self {
        Self {
            id: r.id,
            text: r.text,
            image: r.image,
            location: r.location,
            status: r.status,
            upvotes: r.upvotes,
            share_count: r.share_count,
            pred_confidence: r.pred_confidence,
            tag_id: r.tag_id,
            user_id: r.user_id,
            username,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Request DTO for changing a report's status
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateReportStatusDto {
    /// One of: unverified, verified, rejected, handled, completed
    #[validate(length(min = 1, message = "Status is required"))]
    #[schema(example = "verified")]
    pub status: String,
}

/// Response DTO for a status change
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusResponseDto {
    pub id: Uuid,
    pub status: ReportStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for UpdateStatusResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            status: r.status,
            updated_at: r.updated_at,
        }
    }
}

/// Number of reports per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportStatusCountDto {
    pub total: i64,
    pub unverified: i64,
    pub verified: i64,
    pub rejected: i64,
    pub handled: i64,
    pub completed: i64,
}

impl ReportStatusCountDto {
    pub fn from_counts(counts: &[StatusCount]) -> Self {
        let mut dto = Self::default();
        for row in counts {
            let slot = match row.status {
                ReportStatus::Unverified => &mut dto.unverified,
                ReportStatus::Verified => &mut dto.verified,
                ReportStatus::Rejected => &mut dto.rejected,
                ReportStatus::Handled => &mut dto.handled,
                ReportStatus::Completed => &mut dto.completed,
            };
            *slot += row.count;
            dto.total += row.count;
        }
        dto
    }
}

/// Classification pushed by the inference service
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct InferenceRequestDto {
    pub report_id: Uuid,

    #[validate(length(min = 1, max = 20, message = "Class must be 1-20 characters"))]
    #[schema(example = "pothole")]
    pub class: String,

    /// Defaults to the report's own location when empty
    #[serde(default)]
    #[validate(length(max = 100, message = "Location must not exceed 100 characters"))]
    pub location: String,

    #[validate(range(min = 0, max = 100, message = "Confidence must be between 0 and 100"))]
    pub pred_confidence: Option<i32>,
}

/// Tag a report was attached to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InferenceTagDto {
    pub tag_id: Uuid,
    pub class: String,
    pub location: String,
}

impl From<Tag> for InferenceTagDto {
    fn from(t: Tag) -> Self {
        Self {
            tag_id: t.id,
            class: t.class,
            location: t.location,
        }
    }
}
