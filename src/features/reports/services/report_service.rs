use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::image_validator::validate_image;
use crate::features::reports::dtos::{
    CreateReportResponseDto, InferenceRequestDto, InferenceTagDto, ReportResponseDto,
    ReportStatusCountDto, UpdateStatusResponseDto,
};
use crate::features::reports::error::ReportError;
use crate::features::reports::models::{NewReport, Report, ReportInference, ReportStatus};
use crate::features::reports::repositories::{ReportFilter, ReportRepository, StoreError};
use crate::features::users::{UserDirectory, UserLookupError};
use crate::modules::storage::FileStorage;
use crate::shared::constants::{REPORT_IMAGE_DIR, REPORT_LOCATION_MAX_LEN};
use crate::shared::types::{Meta, PaginationQuery};

pub type Result<T> = std::result::Result<T, ReportError>;

/// Image part of a report submission
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Service for the report lifecycle
pub struct ReportService {
    repository: Arc<dyn ReportRepository>,
    users: Arc<dyn UserDirectory>,
    storage: Arc<dyn FileStorage>,
    enforce_transitions: bool,
}

impl ReportService {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        users: Arc<dyn UserDirectory>,
        storage: Arc<dyn FileStorage>,
        enforce_transitions: bool,
    ) -> Self {
        Self {
            repository,
            users,
            storage,
            enforce_transitions,
        }
    }

    /// Submit a new report for review
    pub async fn create_report(
        &self,
        user_id: Uuid,
        text: &str,
        location: &str,
        image: Option<ImageUpload>,
    ) -> Result<CreateReportResponseDto> {
        let text = text.trim();
        if text.is_empty() && image.is_none() {
            return Err(ReportError::EmptyContent);
        }
        let location = location.trim();
        if location.chars().count() > REPORT_LOCATION_MAX_LEN {
            return Err(ReportError::LocationTooLong {
                max: REPORT_LOCATION_MAX_LEN,
            });
        }

        self.users.get_user(user_id).await.map_err(|e| match e {
            UserLookupError::NotFound(_) => ReportError::UserNotFound,
            other => ReportError::GetUserFailed(other),
        })?;

        let report_id = Uuid::new_v4();
        let image_path = match image {
            Some(upload) => Some(self.store_image(report_id, upload).await?),
            None => None,
        };

        let new_report = NewReport {
            id: report_id,
            user_id,
            text: text.to_string(),
            image: image_path.clone().unwrap_or_default(),
            location: location.to_string(),
        };

        match self.repository.create(new_report).await {
            Ok(report) => Ok(report.into()),
            Err(e) => {
                if let Some(path) = image_path {
                    if let Err(delete_err) = self.storage.delete(&path).await {
                        warn!(
                            report_id = %report_id,
                            path = %path,
                            "Failed to remove image after failed report insert: {}",
                            delete_err
                        );
                    }
                }
                Err(ReportError::CreateReportFailed(e))
            }
        }
    }

    async fn store_image(&self, report_id: Uuid, upload: ImageUpload) -> Result<String> {
        let mut reader = Cursor::new(upload.data.as_ref());
        let image = validate_image(
            &upload.file_name,
            &upload.content_type,
            upload.data.len() as u64,
            &mut reader,
        )?;

        let path = format!("{}/{}.{}", REPORT_IMAGE_DIR, report_id, image.extension);
        self.storage
            .store(&path, upload.data, image.content_type)
            .await
            .map_err(ReportError::ImageStorageFailed)?;

        debug!(report_id = %report_id, path = %path, "Stored report image");
        Ok(path)
    }

    /// Get a single report with its owner's name
    pub async fn get_report(&self, id: Uuid) -> Result<ReportResponseDto> {
        let report = self.repository.get_by_id(id).await.map_err(|e| match e {
            StoreError::NotFound => ReportError::ReportNotFound,
            other => ReportError::GetReportsFailed(other),
        })?;

        let owner = self
            .users
            .get_user(report.user_id)
            .await
            .map_err(ReportError::GetUserFailed)?;

        Ok(ReportResponseDto::from_report(report, owner.name))
    }

    pub async fn list_reports(
        &self,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ReportResponseDto>, Meta)> {
        self.list(ReportFilter::All, pagination).await
    }

    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ReportResponseDto>, Meta)> {
        self.list(ReportFilter::ByUser(user_id), pagination).await
    }

    pub async fn list_by_status(
        &self,
        status: &str,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ReportResponseDto>, Meta)> {
        let status = parse_status(status)?;
        self.list(ReportFilter::ByStatus(status), pagination).await
    }

    async fn list(
        &self,
        filter: ReportFilter,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ReportResponseDto>, Meta)> {
        let (reports, total) = self
            .repository
            .list(filter, pagination)
            .await
            .map_err(ReportError::GetReportsFailed)?;

        let reports = self.attach_owner_names(reports).await?;
        Ok((reports, pagination.meta(total)))
    }

    /// Resolve every owner on the page in one lookup. A single unknown owner
    /// fails the whole page.
    async fn attach_owner_names(&self, reports: Vec<Report>) -> Result<Vec<ReportResponseDto>> {
        if reports.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = reports
            .iter()
            .map(|r| r.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let names: HashMap<Uuid, String> = self
            .users
            .get_users(&ids)
            .await
            .map_err(ReportError::GetUserFailed)?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        reports
            .into_iter()
            .map(|report| {
                let name = names.get(&report.user_id).cloned().ok_or_else(|| {
                    ReportError::GetUserFailed(UserLookupError::NotFound(report.user_id))
                })?;
                Ok(ReportResponseDto::from_report(report, name))
            })
            .collect()
    }

    /// Move a report along the review lifecycle
    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<UpdateStatusResponseDto> {
        let next = parse_status(status)?;

        let current = self
            .repository
            .get_by_id(id)
            .await
            .map_err(ReportError::UpdateStatusFailed)?;

        if current.status == next {
            return Ok(current.into());
        }

        if self.enforce_transitions && !current.status.can_transition_to(next) {
            return Err(ReportError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let updated = self
            .repository
            .update_status(id, current.status, next)
            .await
            .map_err(ReportError::UpdateStatusFailed)?;

        info!(report_id = %id, from = %current.status, to = %next, "Report status changed");
        Ok(updated.into())
    }

    pub async fn count_by_status(&self) -> Result<ReportStatusCountDto> {
        let counts = self
            .repository
            .count_by_status()
            .await
            .map_err(ReportError::GetReportsFailed)?;

        Ok(ReportStatusCountDto::from_counts(&counts))
    }

    /// Record an automated classification and attach the report to its tag
    pub async fn update_inference(
        &self,
        dto: InferenceRequestDto,
    ) -> Result<Vec<InferenceTagDto>> {
        dto.validate()
            .map_err(|e| ReportError::InvalidInference(e.to_string()))?;

        let class = dto.class.trim();
        if class.is_empty() {
            return Err(ReportError::InvalidInference(
                "Class must not be blank".to_string(),
            ));
        }

        let inference = ReportInference {
            report_id: dto.report_id,
            class: class.to_string(),
            location: dto.location.trim().to_string(),
            confidence: dto.pred_confidence,
        };

        let (_, tag) = self
            .repository
            .apply_inference(inference)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => ReportError::ReportNotFound,
                other => ReportError::UpdateInferenceFailed(other),
            })?;

        Ok(vec![tag.into()])
    }
}

fn parse_status(status: &str) -> Result<ReportStatus> {
    status
        .parse::<ReportStatus>()
        .map_err(|_| ReportError::InvalidStatus(status.to_string()))
}
