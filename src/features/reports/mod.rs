//! Citizen reports feature.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/reports` | Submit a report (multipart) |
//! | GET | `/api/reports` | List reports |
//! | GET | `/api/reports/{id}` | Get a report |
//! | GET | `/api/reports/user/{id}` | List a user's reports |
//! | GET | `/api/reports/status/{status}` | List reports by status |
//! | GET | `/api/reports/count` | Count reports per status |
//! | POST | `/api/reports/{id}/status` | Change status (admin) |
//! | POST | `/api/reports/inference` | Inference webhook (`X-WEBHOOK-TOKEN`) |

pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::PgReportRepository;
pub use routes::{routes, webhook_routes};
pub use services::ReportService;
