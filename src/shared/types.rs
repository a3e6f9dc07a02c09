use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::shared::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<Meta>,
    pub errors: Option<Vec<String>>,
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Meta {
    pub page: i64,
    pub per_page: i64,
    pub max_page: i64,
    pub count: i64,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Standard pagination query parameters for list endpoints.
///
/// Absent, non-numeric or non-positive values fall back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// Page number (1-indexed, default: 1)
    #[serde(default, deserialize_with = "lenient_i64")]
    #[param(minimum = 1)]
    pub page: Option<i64>,

    /// Number of items per page (default: 10, max: 100)
    #[serde(default, deserialize_with = "lenient_i64")]
    #[param(minimum = 1, maximum = 100)]
    pub per_page: Option<i64>,

    /// Case-insensitive substring filter over report text
    pub search: Option<String>,
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<i64>().ok()))
}

impl PaginationQuery {
    pub fn new(page: Option<i64>, per_page: Option<i64>, search: Option<&str>) -> Self {
        Self {
            page,
            per_page,
            search: search.map(String::from),
        }
    }

    /// Page number with defaults applied
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    /// Page size with defaults applied and clamped to MAX_PAGE_SIZE
    pub fn limit(&self) -> i64 {
        self.per_page
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    /// Calculate SQL OFFSET from page number
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Trimmed search text, `None` when blank
    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn meta(&self, count: i64) -> Meta {
        Meta {
            page: self.page(),
            per_page: self.limit(),
            max_page: max_page(count, self.limit()),
            count,
        }
    }
}

/// `ceil(count / per_page)`
pub fn max_page(count: i64, per_page: i64) -> i64 {
    if per_page <= 0 || count <= 0 {
        return 0;
    }
    (count + per_page - 1) / per_page
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            data,
            message,
            meta,
            errors: None,
        }
    }

    pub fn error(message: Option<String>, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message,
            meta: None,
            errors,
        }
    }
}
