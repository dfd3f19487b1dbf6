// src/health/http.rs
use super::indicator::{HealthCheckError, HealthIndicator};
use super::status::{get_status, HealthIndicatorResult, HealthIndicatorStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Map;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};
use url::Url;

/// Pings a URL with GET; any 2xx answer is healthy.
#[derive(Debug, Clone)]
pub struct HttpHealthIndicator {
    key: String,
    url: Url,
    timeout: Duration,
    client: Client,
}

impl HttpHealthIndicator {
    pub fn new(key: impl Into<String>, url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            key: key.into(),
            url,
            timeout,
            client,
        })
    }

    pub async fn ping_check(
        &self,
        key: &str,
        url: &Url,
    ) -> Result<HealthIndicatorResult, HealthCheckError> {
        let start = std::time::Instant::now();
        let result = timeout(self.timeout, self.client.get(url.as_str()).send()).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let failure = match result {
            Ok(Ok(response)) => {
                let status = response.status();
                if status.is_success() {
                    debug!("Ping {} to {} succeeded in {}ms", key, url, response_time_ms);
                    return Ok(get_status(key, true, Map::new()));
                }
                HealthIndicatorStatus::down()
                    .with_message(format!("HTTP {}", status))
                    .with("statusCode", status.as_u16())
                    .with("statusText", status.canonical_reason().unwrap_or_default())
            }
            Ok(Err(e)) => HealthIndicatorStatus::down().with_message(e.to_string()),
            Err(_) => HealthIndicatorStatus::down().with_message("Request timeout"),
        };

        warn!(
            "Ping {} to {} failed after {}ms: {:?}",
            key,
            url,
            response_time_ms,
            failure.data.get("message")
        );

        let mut causes = HealthIndicatorResult::new();
        causes.insert(key.to_string(), failure);
        Err(HealthCheckError::failed(format!("Ping check {} failed", key), causes))
    }
}

#[async_trait]
impl HealthIndicator for HttpHealthIndicator {
    fn key(&self) -> &str {
        &self.key
    }

    async fn check(&self) -> Result<HealthIndicatorResult, HealthCheckError> {
        self.ping_check(&self.key, &self.url).await
    }
}
