/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Maximum accepted report image size (10 MiB)
pub const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

/// Storage prefix for report images
pub const REPORT_IMAGE_DIR: &str = "reports";

/// Maximum length of a report location
pub const REPORT_LOCATION_MAX_LEN: usize = 255;

/// Maximum length of a tag location
pub const TAG_LOCATION_MAX_LEN: usize = 100;
