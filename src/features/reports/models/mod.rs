mod report;
mod report_tag;

pub use report::{NewReport, Report, ReportInference, ReportStatus, StatusCount};
pub use report_tag::Tag;
