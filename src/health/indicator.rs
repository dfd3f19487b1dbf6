// src/health/indicator.rs
use super::status::HealthIndicatorResult;
use async_trait::async_trait;

/// A single independent probe.
///
/// `check` resolves to the probe's result keyed by [`HealthIndicator::key`],
/// or fails with [`HealthCheckError::Failed`] carrying the same keyed result
/// marked down so the aggregator can still report it.
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    /// Name this check reports under.
    fn key(&self) -> &str;

    async fn check(&self) -> Result<HealthIndicatorResult, HealthCheckError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HealthCheckError {
    #[error("{message}")]
    Failed {
        message: String,
        causes: HealthIndicatorResult,
    },

    #[error("Unexpected health check error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl HealthCheckError {
    pub fn failed(message: impl Into<String>, causes: HealthIndicatorResult) -> Self {
        HealthCheckError::Failed {
            message: message.into(),
            causes,
        }
    }

    /// Partial status attached to the failure, if the check produced one.
    pub fn causes(&self) -> Option<&HealthIndicatorResult> {
        match self {
            HealthCheckError::Failed { causes, .. } => Some(causes),
            HealthCheckError::Unexpected(_) => None,
        }
    }
}
