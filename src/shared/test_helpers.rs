//! In-memory collaborators and auth helpers for unit and handler tests.

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::Response, Router};
use bytes::Bytes;
use chrono::{Duration, Utc};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::features::auth::model::{AuthenticatedUser, ROLE_ADMIN};
use crate::features::reports::models::{
    NewReport, Report, ReportInference, ReportStatus, StatusCount, Tag,
};
use crate::features::reports::repositories::{ReportFilter, ReportRepository, StoreError};
use crate::features::users::{User, UserDirectory, UserLookupError};
use crate::modules::messaging::{EventPublisher, NoopPublisher, PublishError, ReportCreatedEvent};
use crate::modules::storage::{FileStorage, StorageError};
use crate::shared::constants::TAG_LOCATION_MAX_LEN;
use crate::shared::types::PaginationQuery;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Smallest byte sequence the image sniffer accepts as PNG
pub fn png_bytes() -> Bytes {
    Bytes::from_static(&[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R',
    ])
}

/// Random report body for tests that only care about counts
pub fn fake_report_text() -> String {
    Sentence(3..8).fake()
}

// =============================================================================
// AUTH
// =============================================================================

pub fn create_user(role: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: Uuid::new_v4(),
        role: role.to_string(),
    }
}

pub fn create_admin_user() -> AuthenticatedUser {
    create_user(ROLE_ADMIN)
}

/// Inject `user` into every request the same way the JWT middleware does
pub fn with_auth(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                let response: Response = next.run(request).await;
                response
            }
        },
    ))
}

// =============================================================================
// PUBLISHERS
// =============================================================================

#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Bytes)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportCreatedEvent> {
        lock(&self.published)
            .iter()
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }

    pub fn topics(&self) -> Vec<String> {
        lock(&self.published).iter().map(|(t, _)| t.clone()).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        lock(&self.published).push((topic.to_string(), payload));
        Ok(())
    }
}

/// Publisher whose broker never acknowledges
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _topic: &str, _payload: Bytes) -> Result<(), PublishError> {
        Err(PublishError::Transport("broker unavailable".to_string()))
    }
}

// =============================================================================
// USER DIRECTORY
// =============================================================================

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<Uuid, User>>,
    batch_lookups: AtomicUsize,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.insert(id, name);
        id
    }

    /// Add a user with a generated display name
    pub fn add_fake_user(&self) -> (Uuid, String) {
        let name: String = Name().fake();
        (self.add_user(&name), name)
    }

    pub fn insert(&self, id: Uuid, name: &str) {
        lock(&self.users).insert(
            id,
            User {
                id,
                name: name.to_string(),
                role: "user".to_string(),
            },
        );
    }

    pub fn remove_user(&self, id: Uuid) {
        lock(&self.users).remove(&id);
    }

    pub fn batch_lookups(&self) -> usize {
        self.batch_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, id: Uuid) -> Result<User, UserLookupError> {
        lock(&self.users)
            .get(&id)
            .cloned()
            .ok_or(UserLookupError::NotFound(id))
    }

    async fn get_users(&self, ids: &[Uuid]) -> Result<Vec<User>, UserLookupError> {
        self.batch_lookups.fetch_add(1, Ordering::SeqCst);
        let users = lock(&self.users);
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

#[derive(Default)]
pub struct InMemoryFileStorage {
    files: Mutex<HashMap<String, (Bytes, String)>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        lock(&self.files).contains_key(path)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).map(|(_, ct)| ct.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.files).len()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn store(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        lock(&self.files).insert(path.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        lock(&self.files).remove(path);
        Ok(())
    }
}

// =============================================================================
// REPORT REPOSITORY
// =============================================================================

#[derive(Default)]
struct Store {
    reports: Vec<Report>,
    tags: Vec<Tag>,
}

/// Report gateway backed by a vector, mirroring the PostgreSQL semantics
pub struct InMemoryReportRepository {
    store: Mutex<Store>,
    publisher: Arc<dyn EventPublisher>,
    concurrent_write: Mutex<Option<(Uuid, ReportStatus)>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::with_publisher(Arc::new(NoopPublisher))
    }

    pub fn with_publisher(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            publisher,
            concurrent_write: Mutex::new(None),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.store).reports.len()
    }

    /// Simulate another writer setting `status` right after `id` is next read
    pub fn change_status_after_next_read(&self, id: Uuid, status: ReportStatus) {
        *lock(&self.concurrent_write) = Some((id, status));
    }

    pub fn tag_count(&self, tag_id: Uuid) -> Option<i32> {
        lock(&self.store)
            .tags
            .iter()
            .find(|t| t.id == tag_id)
            .map(|t| t.report_count)
    }

    fn matches(report: &Report, filter: ReportFilter, search: Option<&str>) -> bool {
        let filter_ok = match filter {
            ReportFilter::All => true,
            ReportFilter::ByUser(id) => report.user_id == id,
            ReportFilter::ByStatus(status) => report.status == status,
        };
        let search_ok = search
            .map(|s| report.text.to_lowercase().contains(&s.to_lowercase()))
            .unwrap_or(true);
        filter_ok && search_ok
    }
}

impl Default for InMemoryReportRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn create(&self, new_report: NewReport) -> Result<Report, StoreError> {
        let created_at = {
            let store = lock(&self.store);
            // Strictly increasing timestamps keep newest-first ordering stable
            Utc::now() + Duration::milliseconds(store.reports.len() as i64)
        };

        let report = Report {
            id: new_report.id,
            text: new_report.text,
            image: new_report.image,
            status: ReportStatus::Unverified,
            pred_confidence: None,
            upvotes: 0,
            share_count: 0,
            location: new_report.location,
            user_id: new_report.user_id,
            tag_id: None,
            created_at,
            updated_at: created_at,
        };

        let event = ReportCreatedEvent::new(report.id, &report.text, &report.image, "http://test");
        self.publisher.publish("reports", event.to_bytes()?).await?;

        lock(&self.store).reports.push(report.clone());
        Ok(report)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Report, StoreError> {
        let mut store = lock(&self.store);
        let report = store
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        let read = report.clone();

        let mut pending = lock(&self.concurrent_write);
        if let Some((target, status)) = *pending {
            if target == id {
                report.status = status;
                *pending = None;
            }
        }
        Ok(read)
    }

    async fn list(
        &self,
        filter: ReportFilter,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<Report>, i64), StoreError> {
        let store = lock(&self.store);
        let mut matching: Vec<Report> = store
            .reports
            .iter()
            .filter(|r| Self::matches(r, filter, pagination.search()))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ReportStatus,
        status: ReportStatus,
    ) -> Result<Report, StoreError> {
        let mut store = lock(&self.store);
        let report = store
            .reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;

        if report.status != expected {
            return Err(StoreError::Conflict);
        }
        report.status = status;
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn count_by_status(&self) -> Result<Vec<StatusCount>, StoreError> {
        let store = lock(&self.store);
        let mut counts: HashMap<ReportStatus, i64> = HashMap::new();
        for report in &store.reports {
            *counts.entry(report.status).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    async fn apply_inference(
        &self,
        inference: ReportInference,
    ) -> Result<(Report, Tag), StoreError> {
        let mut store = lock(&self.store);
        let Store { reports, tags } = &mut *store;

        let report = reports
            .iter_mut()
            .find(|r| r.id == inference.report_id)
            .ok_or(StoreError::NotFound)?;

        let location: String = if inference.location.is_empty() {
            report.location.chars().take(TAG_LOCATION_MAX_LEN).collect()
        } else {
            inference.location.clone()
        };

        let tag_index = match tags
            .iter()
            .position(|t| t.class == inference.class && t.location == location)
        {
            Some(index) => index,
            None => {
                let now = Utc::now();
                tags.push(Tag {
                    id: Uuid::new_v4(),
                    location,
                    class: inference.class.clone(),
                    report_count: 0,
                    created_at: now,
                    updated_at: now,
                });
                tags.len() - 1
            }
        };
        let tag_id = tags[tag_index].id;

        if report.tag_id != Some(tag_id) {
            if let Some(old) = report.tag_id {
                if let Some(old_tag) = tags.iter_mut().find(|t| t.id == old) {
                    old_tag.report_count = (old_tag.report_count - 1).max(0);
                }
            }
            tags[tag_index].report_count += 1;
        }

        report.tag_id = Some(tag_id);
        if inference.confidence.is_some() {
            report.pred_confidence = inference.confidence;
        }
        report.updated_at = Utc::now();

        Ok((report.clone(), tags[tag_index].clone()))
    }
}
