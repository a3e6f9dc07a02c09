use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::features::reports::models::{
    NewReport, Report, ReportInference, ReportStatus, StatusCount, Tag,
};
use crate::modules::messaging::{EventPublisher, PublishError, ReportCreatedEvent};
use crate::shared::constants::TAG_LOCATION_MAX_LEN;
use crate::shared::types::PaginationQuery;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("report not found")]
    NotFound,

    #[error("report was modified concurrently")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to publish report event: {0}")]
    Publish(#[from] PublishError),
}

/// Which reports a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFilter {
    All,
    ByUser(Uuid),
    ByStatus(ReportStatus),
}

impl ReportFilter {
    fn user_id(&self) -> Option<Uuid> {
        match self {
            ReportFilter::ByUser(id) => Some(*id),
            _ => None,
        }
    }

    fn status(&self) -> Option<ReportStatus> {
        match self {
            ReportFilter::ByStatus(status) => Some(*status),
            _ => None,
        }
    }
}

/// Persistence gateway for reports and their tags
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a report and announce it. Nothing is stored unless the
    /// announcement is acknowledged.
    async fn create(&self, report: NewReport) -> Result<Report, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Report, StoreError>;

    /// One page of matching reports, newest first, plus the total match count
    async fn list(
        &self,
        filter: ReportFilter,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<Report>, i64), StoreError>;

    /// Set `status` only if the stored status still equals `expected`
    async fn update_status(
        &self,
        id: Uuid,
        expected: ReportStatus,
        status: ReportStatus,
    ) -> Result<Report, StoreError>;

    /// Row counts per status; statuses without rows are omitted
    async fn count_by_status(&self) -> Result<Vec<StatusCount>, StoreError>;

    /// Attach the report to the shared tag for `(class, location)`
    async fn apply_inference(&self, inference: ReportInference)
        -> Result<(Report, Tag), StoreError>;
}

const REPORT_COLUMNS: &str = "id, text, image, status, pred_confidence, upvotes, share_count, \
     location, user_id, tag_id, created_at, updated_at";

const TAG_COLUMNS: &str = "id, location, class, report_count, created_at, updated_at";

/// Filters shared by the count and page queries. Backslash is the default
/// LIKE escape character in PostgreSQL.
const LIST_CONDITIONS: &str = "($1::uuid IS NULL OR user_id = $1) \
     AND ($2::report_status IS NULL OR status = $2) \
     AND ($3::text IS NULL OR text ILIKE $3)";

/// Escape LIKE wildcards so user input only ever matches literally
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct PgReportRepository {
    pool: PgPool,
    publisher: Arc<dyn EventPublisher>,
    topic: String,
    public_base_url: String,
}

impl PgReportRepository {
    pub fn new(
        pool: PgPool,
        publisher: Arc<dyn EventPublisher>,
        topic: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            publisher,
            topic: topic.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ReportRepository for PgReportRepository {
    async fn create(&self, new_report: NewReport) -> Result<Report, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO reports (id, text, image, location, user_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let report: Report = sqlx::query_as(&query)
            .bind(new_report.id)
            .bind(&new_report.text)
            .bind(&new_report.image)
            .bind(&new_report.location)
            .bind(new_report.user_id)
            .bind(ReportStatus::Unverified)
            .fetch_one(&mut *tx)
            .await?;

        let event =
            ReportCreatedEvent::new(report.id, &report.text, &report.image, &self.public_base_url);
        let published = match event.to_bytes() {
            Ok(payload) => self.publisher.publish(&self.topic, payload).await,
            Err(e) => Err(e),
        };

        if let Err(e) = published {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(report_id = %report.id, "Rollback after failed publish failed: {}", rollback_err);
            }
            return Err(e.into());
        }

        tx.commit().await?;

        info!(report_id = %report.id, user_id = %report.user_id, "Report created");
        Ok(report)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report, StoreError> {
        let query = format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS);

        sqlx::query_as::<_, Report>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn list(
        &self,
        filter: ReportFilter,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<Report>, i64), StoreError> {
        let search_pattern = pagination
            .search()
            .map(|s| format!("%{}%", escape_like(s)));

        let count_query = format!("SELECT COUNT(*) FROM reports WHERE {}", LIST_CONDITIONS);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(filter.user_id())
            .bind(filter.status())
            .bind(search_pattern.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let query = format!(
            r#"
            SELECT {}
            FROM reports
            WHERE {}
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#,
            REPORT_COLUMNS, LIST_CONDITIONS
        );
        let reports: Vec<Report> = sqlx::query_as(&query)
            .bind(filter.user_id())
            .bind(filter.status())
            .bind(search_pattern.as_deref())
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await?;

        debug!(?filter, total, returned = reports.len(), "Listed reports");
        Ok((reports, total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ReportStatus,
        status: ReportStatus,
    ) -> Result<Report, StoreError> {
        let query = format!(
            r#"
            UPDATE reports
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let updated: Option<Report> = sqlx::query_as(&query)
            .bind(id)
            .bind(expected)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(report) = updated {
            info!(report_id = %id, from = %expected, to = %status, "Report status updated");
            return Ok(report);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reports WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn count_by_status(&self) -> Result<Vec<StatusCount>, StoreError> {
        let counts = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM reports GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn apply_inference(
        &self,
        inference: ReportInference,
    ) -> Result<(Report, Tag), StoreError> {
        let mut tx = self.pool.begin().await?;

        let lock_query = format!(
            "SELECT {} FROM reports WHERE id = $1 FOR UPDATE",
            REPORT_COLUMNS
        );
        let report: Report = sqlx::query_as(&lock_query)
            .bind(inference.report_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;

        let location = if inference.location.trim().is_empty() {
            report.location.chars().take(TAG_LOCATION_MAX_LEN).collect()
        } else {
            inference.location.trim().to_string()
        };

        // DO NOTHING leaves an existing tag unlocked until the ordered lock below
        sqlx::query(
            r#"
            INSERT INTO tags (id, location, class, report_count)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (class, location) DO NOTHING
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&location)
        .bind(&inference.class)
        .execute(&mut *tx)
        .await?;

        let tag_query = format!(
            "SELECT {} FROM tags WHERE class = $1 AND location = $2",
            TAG_COLUMNS
        );
        let mut tag: Tag = sqlx::query_as(&tag_query)
            .bind(&inference.class)
            .bind(&location)
            .fetch_one(&mut *tx)
            .await?;

        if report.tag_id != Some(tag.id) {
            // Tag rows are locked in id order so opposite moves cannot deadlock
            let tag_ids: Vec<Uuid> = report.tag_id.into_iter().chain([tag.id]).collect();
            sqlx::query("SELECT id FROM tags WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(&tag_ids)
                .fetch_all(&mut *tx)
                .await?;

            if let Some(old_tag_id) = report.tag_id {
                sqlx::query(
                    r#"
                    UPDATE tags
                    SET report_count = GREATEST(report_count - 1, 0), updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(old_tag_id)
                .execute(&mut *tx)
                .await?;
            }

            let increment_query = format!(
                r#"
                UPDATE tags
                SET report_count = report_count + 1, updated_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                TAG_COLUMNS
            );
            tag = sqlx::query_as(&increment_query)
                .bind(tag.id)
                .fetch_one(&mut *tx)
                .await?;
        }

        let update_query = format!(
            r#"
            UPDATE reports
            SET tag_id = $2, pred_confidence = COALESCE($3, pred_confidence), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REPORT_COLUMNS
        );
        let report: Report = sqlx::query_as(&update_query)
            .bind(report.id)
            .bind(tag.id)
            .bind(inference.confidence)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            report_id = %report.id,
            tag_id = %tag.id,
            class = %tag.class,
            "Inference applied"
        );
        Ok((report, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("jalan"), "jalan");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
    }

    #[test]
    fn test_filter_binds() {
        let user = Uuid::new_v4();
        assert_eq!(ReportFilter::ByUser(user).user_id(), Some(user));
        assert_eq!(ReportFilter::ByUser(user).status(), None);
        assert_eq!(
            ReportFilter::ByStatus(ReportStatus::Handled).status(),
            Some(ReportStatus::Handled)
        );
        assert_eq!(ReportFilter::All.user_id(), None);
        assert_eq!(ReportFilter::All.status(), None);
    }

    mod postgres {
        use super::*;
        use crate::modules::messaging::NoopPublisher;
        use crate::shared::test_helpers::{FailingPublisher, RecordingPublisher};

        fn repository(pool: &PgPool, publisher: Arc<dyn EventPublisher>) -> PgReportRepository {
            PgReportRepository::new(pool.clone(), publisher, "reports", "http://cdn.test")
        }

        async fn insert_user(pool: &PgPool) -> Uuid {
            let id = Uuid::new_v4();
            sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
                .bind(id)
                .bind("Budi")
                .bind(format!("{}@example.com", id))
                .execute(pool)
                .await
                .unwrap();
            id
        }

        async fn insert_report(
            repo: &PgReportRepository,
            user_id: Uuid,
            text: &str,
            location: &str,
        ) -> Report {
            repo.create(NewReport {
                id: Uuid::new_v4(),
                user_id,
                text: text.to_string(),
                image: String::new(),
                location: location.to_string(),
            })
            .await
            .unwrap()
        }

        fn inference(report_id: Uuid, class: &str, location: &str) -> ReportInference {
            ReportInference {
                report_id,
                class: class.to_string(),
                location: location.to_string(),
                confidence: Some(80),
            }
        }

        #[sqlx::test]
        #[ignore] // Requires database
        async fn test_create_commits_after_publish(pool: PgPool) {
            let publisher = Arc::new(RecordingPublisher::new());
            let repo = repository(&pool, publisher.clone());
            let user = insert_user(&pool).await;

            let report = insert_report(&repo, user, "Jalan rusak", "Bandung").await;

            assert_eq!(report.status, ReportStatus::Unverified);
            assert_eq!(report.tag_id, None);
            assert_eq!(repo.get_by_id(report.id).await.unwrap().text, "Jalan rusak");
            assert_eq!(publisher.events()[0].report_id, report.id);
        }

        #[sqlx::test]
        #[ignore] // Requires database
        async fn test_create_rolls_back_when_publish_fails(pool: PgPool) {
            let repo = repository(&pool, Arc::new(FailingPublisher));
            let user = insert_user(&pool).await;
            let id = Uuid::new_v4();

            let result = repo
                .create(NewReport {
                    id,
                    user_id: user,
                    text: "Jalan rusak".to_string(),
                    image: String::new(),
                    location: String::new(),
                })
                .await;

            assert!(matches!(result, Err(StoreError::Publish(_))));
            assert!(matches!(repo.get_by_id(id).await, Err(StoreError::NotFound)));
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(total, 0);
        }

        #[sqlx::test]
        #[ignore] // Requires database
        async fn test_list_filters_and_literal_search(pool: PgPool) {
            let repo = repository(&pool, Arc::new(NoopPublisher));
            let budi = insert_user(&pool).await;
            let sari = insert_user(&pool).await;
            let first = insert_report(&repo, budi, "Diskon 100% jalan", "").await;
            insert_report(&repo, budi, "1000 lubang", "").await;
            insert_report(&repo, sari, "Lampu_mati", "").await;

            let all = PaginationQuery::default();
            let (reports, total) = repo.list(ReportFilter::All, &all).await.unwrap();
            assert_eq!(total, 3);
            assert_eq!(reports.len(), 3);

            let (_, total) = repo.list(ReportFilter::ByUser(budi), &all).await.unwrap();
            assert_eq!(total, 2);

            let percent = PaginationQuery::new(None, None, Some("100%"));
            let (reports, total) = repo.list(ReportFilter::All, &percent).await.unwrap();
            assert_eq!(total, 1);
            assert_eq!(reports[0].id, first.id);

            let underscore = PaginationQuery::new(None, None, Some("_"));
            let (_, total) = repo.list(ReportFilter::All, &underscore).await.unwrap();
            assert_eq!(total, 1);

            repo.update_status(first.id, ReportStatus::Unverified, ReportStatus::Verified)
                .await
                .unwrap();
            let (reports, total) = repo
                .list(ReportFilter::ByStatus(ReportStatus::Verified), &all)
                .await
                .unwrap();
            assert_eq!(total, 1);
            assert_eq!(reports[0].id, first.id);
        }

        #[sqlx::test]
        #[ignore] // Requires database
        async fn test_update_status_tells_conflict_from_missing(pool: PgPool) {
            let repo = repository(&pool, Arc::new(NoopPublisher));
            let user = insert_user(&pool).await;
            let report = insert_report(&repo, user, "Jalan rusak", "").await;

            let updated = repo
                .update_status(report.id, ReportStatus::Unverified, ReportStatus::Verified)
                .await
                .unwrap();
            assert_eq!(updated.status, ReportStatus::Verified);

            let stale = repo
                .update_status(report.id, ReportStatus::Unverified, ReportStatus::Rejected)
                .await;
            assert!(matches!(stale, Err(StoreError::Conflict)));
            assert_eq!(
                repo.get_by_id(report.id).await.unwrap().status,
                ReportStatus::Verified
            );

            let missing = repo
                .update_status(Uuid::new_v4(), ReportStatus::Unverified, ReportStatus::Verified)
                .await;
            assert!(matches!(missing, Err(StoreError::NotFound)));
        }

        #[sqlx::test]
        #[ignore] // Requires database
        async fn test_count_by_status(pool: PgPool) {
            let repo = repository(&pool, Arc::new(NoopPublisher));
            let user = insert_user(&pool).await;
            let report = insert_report(&repo, user, "a", "").await;
            insert_report(&repo, user, "b", "").await;
            repo.update_status(report.id, ReportStatus::Unverified, ReportStatus::Rejected)
                .await
                .unwrap();

            let mut counts = repo.count_by_status().await.unwrap();
            counts.sort_by_key(|c| c.status.as_str());

            assert_eq!(counts.len(), 2);
            assert_eq!(counts[0].status, ReportStatus::Rejected);
            assert_eq!(counts[0].count, 1);
            assert_eq!(counts[1].status, ReportStatus::Unverified);
            assert_eq!(counts[1].count, 1);
        }

        #[sqlx::test]
        #[ignore] // Requires database
        async fn test_apply_inference_shares_and_moves_tags(pool: PgPool) {
            let repo = repository(&pool, Arc::new(NoopPublisher));
            let user = insert_user(&pool).await;
            let first = insert_report(&repo, user, "a", "Bandung").await;
            let second = insert_report(&repo, user, "b", "Bandung").await;

            let (report, pothole) = repo
                .apply_inference(inference(first.id, "pothole", ""))
                .await
                .unwrap();
            assert_eq!(report.tag_id, Some(pothole.id));
            assert_eq!(report.pred_confidence, Some(80));
            assert_eq!(pothole.location, "Bandung");
            assert_eq!(pothole.report_count, 1);

            let (_, shared) = repo
                .apply_inference(inference(second.id, "pothole", "Bandung"))
                .await
                .unwrap();
            assert_eq!(shared.id, pothole.id);
            assert_eq!(shared.report_count, 2);

            let (_, again) = repo
                .apply_inference(inference(second.id, "pothole", "Bandung"))
                .await
                .unwrap();
            assert_eq!(again.report_count, 2);

            let (moved, flood) = repo
                .apply_inference(ReportInference {
                    confidence: None,
                    ..inference(second.id, "flood", "Bandung")
                })
                .await
                .unwrap();
            assert_ne!(flood.id, pothole.id);
            assert_eq!(flood.report_count, 1);
            assert_eq!(moved.pred_confidence, Some(80));

            let count: i32 = sqlx::query_scalar("SELECT report_count FROM tags WHERE id = $1")
                .bind(pothole.id)
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 1);

            let missing = repo
                .apply_inference(inference(Uuid::new_v4(), "flood", "Bandung"))
                .await;
            assert!(matches!(missing, Err(StoreError::NotFound)));
        }
    }
}
