use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
};
use utoipa::{Modify, OpenApi};

use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        reports_handlers::create_report,
        reports_handlers::list_reports,
        reports_handlers::get_report,
        reports_handlers::list_reports_by_user,
        reports_handlers::list_reports_by_status,
        reports_handlers::count_reports_by_status,
        reports_handlers::update_report_status,
        reports_handlers::update_report_inference,
    ),
    components(
        schemas(
            Meta,
            reports_models::ReportStatus,
            reports_dtos::CreateReportFormDto,
            reports_dtos::CreateReportResponseDto,
            reports_dtos::ReportResponseDto,
            reports_dtos::UpdateReportStatusDto,
            reports_dtos::UpdateStatusResponseDto,
            reports_dtos::ReportStatusCountDto,
            reports_dtos::InferenceRequestDto,
            reports_dtos::InferenceTagDto,
            ApiResponse<reports_dtos::CreateReportResponseDto>,
            ApiResponse<reports_dtos::ReportResponseDto>,
            ApiResponse<Vec<reports_dtos::ReportResponseDto>>,
            ApiResponse<reports_dtos::UpdateStatusResponseDto>,
            ApiResponse<reports_dtos::ReportStatusCountDto>,
            ApiResponse<Vec<reports_dtos::InferenceTagDto>>,
        )
    ),
    tags(
        (name = "reports", description = "Citizen reports, review lifecycle and inference results"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Lapor API",
        version = "0.1.0",
        description = "API documentation for the citizen report service",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT and webhook token security schemes to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "webhook_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-WEBHOOK-TOKEN"))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
