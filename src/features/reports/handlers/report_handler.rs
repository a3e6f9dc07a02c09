use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::reports::dtos::{
    CreateReportFormDto, CreateReportResponseDto, InferenceRequestDto, InferenceTagDto,
    ReportResponseDto, ReportStatusCountDto, UpdateReportStatusDto, UpdateStatusResponseDto,
};
use crate::features::reports::services::{ImageUpload, ReportService};
use crate::shared::types::{ApiResponse, PaginationQuery};

/// Submit a report
///
/// Accepts multipart/form-data with:
/// - `text`: Report description (required unless an image is attached)
/// - `location`: Free-form location (optional)
/// - `image`: Photo of the incident (optional)
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body(
        content = CreateReportFormDto,
        content_type = "multipart/form-data",
        description = "Report text, location and optional image",
    ),
    responses(
        (status = 200, description = "Report created", body = ApiResponse<CreateReportResponseDto>),
        (status = 400, description = "Empty report or invalid image"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_report(
    user: AuthenticatedUser,
    State(service): State<Arc<ReportService>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CreateReportResponseDto>>> {
    let mut text = String::new();
    let mut location = String::new();
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "text" => {
                text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read text field: {}", e))
                })?;
            }
            "location" => {
                location = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read location field: {}", e))
                })?;
            }
            "image" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read image bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read image data: {}", e))
                })?;

                // Browsers send an empty, unnamed part when no file was picked
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }

                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let report = service
        .create_report(user.user_id, &text, &location, image)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(report),
        Some("Report created".to_string()),
        None,
    )))
}

/// List reports (newest first)
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "reports",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Reports retrieved successfully", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_reports(
    State(service): State<Arc<ReportService>>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let (reports, meta) = service.list_reports(&params).await?;
    Ok(Json(ApiResponse::success(Some(reports), None, Some(meta))))
}

/// Get report by ID
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "reports",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report retrieved successfully", body = ApiResponse<ReportResponseDto>),
        (status = 404, description = "Report not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_report(
    State(service): State<Arc<ReportService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = service.get_report(id).await?;
    Ok(Json(ApiResponse::success(Some(report), None, None)))
}

/// List reports submitted by a user
#[utoipa::path(
    get,
    path = "/api/reports/user/{id}",
    tag = "reports",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "Reports retrieved successfully", body = ApiResponse<Vec<ReportResponseDto>>)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_reports_by_user(
    State(service): State<Arc<ReportService>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let (reports, meta) = service.list_by_user(user_id, &params).await?;
    Ok(Json(ApiResponse::success(Some(reports), None, Some(meta))))
}

/// List reports with a given status
#[utoipa::path(
    get,
    path = "/api/reports/status/{status}",
    tag = "reports",
    params(
        ("status" = String, Path, description = "unverified, verified, rejected, handled or completed"),
        PaginationQuery
    ),
    responses(
        (status = 200, description = "Reports retrieved successfully", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 400, description = "Unknown status")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_reports_by_status(
    State(service): State<Arc<ReportService>>,
    Path(status): Path<String>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let (reports, meta) = service.list_by_status(&status, &params).await?;
    Ok(Json(ApiResponse::success(Some(reports), None, Some(meta))))
}

/// Count reports per status
#[utoipa::path(
    get,
    path = "/api/reports/count",
    tag = "reports",
    responses(
        (status = 200, description = "Status summary", body = ApiResponse<ReportStatusCountDto>)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn count_reports_by_status(
    State(service): State<Arc<ReportService>>,
) -> Result<Json<ApiResponse<ReportStatusCountDto>>> {
    let counts = service.count_by_status().await?;
    Ok(Json(ApiResponse::success(Some(counts), None, None)))
}

/// Change a report's status (admin only)
#[utoipa::path(
    post,
    path = "/api/reports/{id}/status",
    tag = "reports",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    request_body = UpdateReportStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<UpdateStatusResponseDto>),
        (status = 400, description = "Unknown status or disallowed transition"),
        (status = 403, description = "Forbidden - admin only"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report was modified concurrently")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_report_status(
    RequireAdmin(admin): RequireAdmin,
    State(service): State<Arc<ReportService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<UpdateReportStatusDto>,
) -> Result<Json<ApiResponse<UpdateStatusResponseDto>>> {
    debug!(report_id = %id, admin = %admin.user_id, status = %dto.status, "Status change requested");

    let updated = service.update_status(id, &dto.status).await?;
    Ok(Json(ApiResponse::success(
        Some(updated),
        Some("Report status updated".to_string()),
        None,
    )))
}

/// Receive a classification from the inference service
#[utoipa::path(
    post,
    path = "/api/reports/inference",
    tag = "reports",
    request_body = InferenceRequestDto,
    responses(
        (status = 200, description = "Tag attached", body = ApiResponse<Vec<InferenceTagDto>>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid webhook token"),
        (status = 404, description = "Report not found")
    ),
    security(
        ("webhook_token" = [])
    )
)]
pub async fn update_report_inference(
    State(service): State<Arc<ReportService>>,
    AppJson(dto): AppJson<InferenceRequestDto>,
) -> Result<Json<ApiResponse<Vec<InferenceTagDto>>>> {
    let tags = service.update_inference(dto).await?;
    Ok(Json(ApiResponse::success(Some(tags), None, None)))
}
