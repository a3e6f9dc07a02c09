mod image_validator;
mod report_service;

pub use image_validator::ImageValidationError;
pub use report_service::{ImageUpload, ReportService};
