use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::middleware::webhook_token_middleware;
use crate::features::reports::handlers::{
    count_reports_by_status, create_report, get_report, list_reports, list_reports_by_status,
    list_reports_by_user, update_report_inference, update_report_status,
};
use crate::features::reports::services::ReportService;
use crate::shared::constants::MAX_IMAGE_SIZE;

/// Create routes for the reports feature (JWT protected by the caller)
pub fn routes(report_service: Arc<ReportService>) -> Router {
    Router::new()
        .route(
            "/api/reports",
            // Allow body size up to MAX_IMAGE_SIZE + buffer for text fields and multipart overhead
            post(create_report)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE as usize + 1024 * 1024))
                .get(list_reports),
        )
        .route("/api/reports/count", get(count_reports_by_status))
        .route("/api/reports/user/{id}", get(list_reports_by_user))
        .route("/api/reports/status/{status}", get(list_reports_by_status))
        .route("/api/reports/{id}", get(get_report))
        .route("/api/reports/{id}/status", post(update_report_status))
        .with_state(report_service)
}

/// Routes called by the inference service, guarded by a shared token
pub fn webhook_routes(report_service: Arc<ReportService>, webhook_token: Arc<String>) -> Router {
    Router::new()
        .route("/api/reports/inference", post(update_report_inference))
        .route_layer(middleware::from_fn_with_state(
            webhook_token,
            webhook_token_middleware,
        ))
        .with_state(report_service)
}
