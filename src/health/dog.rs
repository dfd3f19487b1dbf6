// src/health/dog.rs
use super::indicator::{HealthCheckError, HealthIndicator};
use super::status::{get_status, HealthIndicatorResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const BAD_BOY: &str = "badboy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Dog {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn is_bad_boy(&self) -> bool {
        self.kind == BAD_BOY
    }
}

/// Healthy iff none of the kennel's dogs is a bad boy.
#[derive(Debug, Clone)]
pub struct DogHealthIndicator {
    key: String,
    dogs: Vec<Dog>,
}

impl DogHealthIndicator {
    pub fn new(key: impl Into<String>, dogs: Vec<Dog>) -> Self {
        Self {
            key: key.into(),
            dogs,
        }
    }

    pub fn dogs(&self) -> &[Dog] {
        &self.dogs
    }

    pub fn is_healthy(&self, key: &str) -> Result<HealthIndicatorResult, HealthCheckError> {
        let bad_boys = self.dogs.iter().filter(|dog| dog.is_bad_boy()).count();
        let healthy = bad_boys == 0;

        let mut data = Map::new();
        data.insert("badBoys".to_string(), Value::from(bad_boys));
        let result = get_status(key, healthy, data);

        if healthy {
            debug!("Dog check {} passed", key);
            return Ok(result);
        }

        warn!("Dog check {} failed: {} bad boys", key, bad_boys);
        Err(HealthCheckError::failed("Dogcheck failed", result))
    }
}

#[async_trait]
impl HealthIndicator for DogHealthIndicator {
    fn key(&self) -> &str {
        &self.key
    }

    async fn check(&self) -> Result<HealthIndicatorResult, HealthCheckError> {
        self.is_healthy(&self.key)
    }
}
