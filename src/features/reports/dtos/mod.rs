pub mod report_dto;

pub use report_dto::{
    CreateReportFormDto, CreateReportResponseDto, InferenceRequestDto, InferenceTagDto,
    ReportResponseDto, ReportStatusCountDto, UpdateReportStatusDto, UpdateStatusResponseDto,
};
