// src/health/mod.rs
mod aggregator;
mod dog;
mod http;
mod indicator;
mod report;
mod status;

pub use aggregator::{AggregatorError, HealthCheckService};
pub use dog::{Dog, DogHealthIndicator};
pub use http::HttpHealthIndicator;
pub use indicator::{HealthCheckError, HealthIndicator};
pub use report::{HealthCheckFailure, HealthReport, ReportStatus};
pub use status::{get_status, HealthIndicatorResult, HealthIndicatorStatus, Status};
