// src/health/status.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Up,
    Down,
}

impl Status {
    pub fn is_up(self) -> bool {
        self == Status::Up
    }
}

/// One check's entry in a report: `{ "status": "up", ...metadata }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIndicatorStatus {
    pub status: Status,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl HealthIndicatorStatus {
    pub fn up() -> Self {
        Self {
            status: Status::Up,
            data: Map::new(),
        }
    }

    pub fn down() -> Self {
        Self {
            status: Status::Down,
            data: Map::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.data.insert(field.to_string(), value.into());
        self
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        self.with("message", message.into())
    }
}

/// Check name -> status record. Keys are unique and ordered for stable output.
pub type HealthIndicatorResult = BTreeMap<String, HealthIndicatorStatus>;

/// Builds the single-entry result every indicator reports under its key.
pub fn get_status(key: &str, healthy: bool, data: Map<String, Value>) -> HealthIndicatorResult {
    let status = if healthy { Status::Up } else { Status::Down };
    let mut result = HealthIndicatorResult::new();
    result.insert(key.to_string(), HealthIndicatorStatus { status, data });
    result
}
