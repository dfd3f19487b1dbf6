// src/health/report.rs
use super::status::HealthIndicatorResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Error,
}

/// Merged outcome of every check in one run.
///
/// `details` always holds every check; `info` and `error` split it by
/// outcome. `error` is left out of the body when nothing failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ReportStatus,
    pub info: HealthIndicatorResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HealthIndicatorResult>,
    pub details: HealthIndicatorResult,
}

impl HealthReport {
    pub fn from_parts(info: HealthIndicatorResult, error: HealthIndicatorResult) -> Self {
        let mut details = info.clone();
        details.extend(error.iter().map(|(key, value)| (key.clone(), value.clone())));

        if error.is_empty() {
            Self {
                status: ReportStatus::Ok,
                info,
                error: None,
                details,
            }
        } else {
            Self {
                status: ReportStatus::Error,
                info,
                error: Some(error),
                details,
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReportStatus::Ok
    }

    pub fn failed_keys(&self) -> Vec<&str> {
        self.error
            .as_ref()
            .map(|error| error.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Raised by the aggregator when at least one check is down.
#[derive(Debug, thiserror::Error)]
#[error("Health check failed: {}", failed_keys_label(.report))]
pub struct HealthCheckFailure {
    pub report: HealthReport,
}

fn failed_keys_label(report: &HealthReport) -> String {
    report.failed_keys().join(", ")
}
