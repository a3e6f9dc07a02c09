use thiserror::Error;

use crate::core::error::AppError;
use crate::features::reports::models::ReportStatus;
use crate::features::reports::repositories::StoreError;
use crate::features::reports::services::ImageValidationError;
use crate::features::users::UserLookupError;
use crate::modules::storage::StorageError;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report must contain text or an image")]
    EmptyContent,

    #[error("Location must not exceed {max} characters")]
    LocationTooLong { max: usize },

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageValidationError),

    #[error("Failed to store image: {0}")]
    ImageStorageFailed(StorageError),

    #[error("Invalid report status: {0}")]
    InvalidStatus(String),

    #[error("Cannot change report status from {from} to {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    #[error("Report not found")]
    ReportNotFound,

    #[error("Invalid inference: {0}")]
    InvalidInference(String),

    #[error("Failed to create report: {0}")]
    CreateReportFailed(StoreError),

    #[error("Failed to get reports: {0}")]
    GetReportsFailed(StoreError),

    #[error("Failed to get report owner: {0}")]
    GetUserFailed(UserLookupError),

    #[error("Failed to update report status: {0}")]
    UpdateStatusFailed(StoreError),

    #[error("Failed to update report inference: {0}")]
    UpdateInferenceFailed(StoreError),
}

fn dependency_error(context: &str, err: StoreError) -> AppError {
    match err {
        StoreError::Database(e) => {
            tracing::error!("{}: {:?}", context, e);
            AppError::Database(e)
        }
        StoreError::Publish(e) => {
            AppError::ExternalServiceError(format!("{}: {}", context, e))
        }
        StoreError::NotFound => AppError::NotFound("Report not found".to_string()),
        StoreError::Conflict => {
            AppError::Conflict("Report was modified concurrently, retry".to_string())
        }
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::EmptyContent
            | ReportError::LocationTooLong { .. }
            | ReportError::InvalidStatus(_)
            | ReportError::InvalidInference(_) => AppError::Validation(err.to_string()),
            ReportError::InvalidImage(ImageValidationError::OpenFailure(e)) => {
                AppError::BadRequest(format!("Failed to read image: {}", e))
            }
            ReportError::InvalidImage(e) => AppError::Validation(format!("Invalid image: {}", e)),
            ReportError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            ReportError::UserNotFound | ReportError::ReportNotFound => {
                AppError::NotFound(err.to_string())
            }
            ReportError::ImageStorageFailed(e) => {
                AppError::Internal(format!("Failed to store image: {}", e))
            }
            ReportError::GetUserFailed(e) => {
                AppError::Internal(format!("Failed to get report owner: {}", e))
            }
            ReportError::CreateReportFailed(e) => dependency_error("Failed to create report", e),
            ReportError::GetReportsFailed(e) => dependency_error("Failed to get reports", e),
            ReportError::UpdateStatusFailed(e) => {
                dependency_error("Failed to update report status", e)
            }
            ReportError::UpdateInferenceFailed(e) => {
                dependency_error("Failed to update report inference", e)
            }
        }
    }
}
