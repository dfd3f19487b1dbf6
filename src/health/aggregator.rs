// src/health/aggregator.rs
use super::dog::DogHealthIndicator;
use super::http::HttpHealthIndicator;
use super::indicator::{HealthCheckError, HealthIndicator};
use super::report::{HealthCheckFailure, HealthReport};
use super::status::{HealthIndicatorResult, HealthIndicatorStatus};
use crate::config::HealthCheckConfig;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("Duplicate health check key: {0}")]
    DuplicateKey(String),
}

/// Runs every registered indicator and folds the outcomes into one report.
pub struct HealthCheckService {
    indicators: Vec<Arc<dyn HealthIndicator>>,
    timeout: Duration,
}

impl HealthCheckService {
    pub fn new(
        indicators: Vec<Arc<dyn HealthIndicator>>,
        timeout: Duration,
    ) -> Result<Self, AggregatorError> {
        let mut seen = HashSet::new();
        for indicator in &indicators {
            if !seen.insert(indicator.key().to_string()) {
                return Err(AggregatorError::DuplicateKey(indicator.key().to_string()));
            }
        }

        Ok(Self { indicators, timeout })
    }

    /// The ping check followed by the dog check.
    pub fn from_config(config: &HealthCheckConfig) -> anyhow::Result<Self> {
        let ping = HttpHealthIndicator::new(
            config.ping.key.clone(),
            config.ping.url.clone(),
            config.ping.timeout(),
        )?;
        let dog = DogHealthIndicator::new(config.dog.key.clone(), config.dog.dogs.clone());

        let indicators: Vec<Arc<dyn HealthIndicator>> = vec![Arc::new(ping), Arc::new(dog)];
        Ok(Self::new(indicators, config.timeout())?)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.key()).collect()
    }

    pub async fn check(&self) -> Result<HealthReport, HealthCheckFailure> {
        let mut tasks = Vec::with_capacity(self.indicators.len());

        for indicator in &self.indicators {
            let indicator = indicator.clone();
            let limit = self.timeout;
            let task = tokio::spawn(async move { timeout(limit, indicator.check()).await });
            tasks.push(task);
        }

        // Every check runs to completion; one failure never cancels the rest.
        let results = futures::future::join_all(tasks).await;

        let mut info = HealthIndicatorResult::new();
        let mut error = HealthIndicatorResult::new();

        for (indicator, result) in self.indicators.iter().zip(results) {
            let key = indicator.key();
            match result {
                Ok(Ok(Ok(outcome))) => {
                    if outcome.is_empty() {
                        info.insert(key.to_string(), HealthIndicatorStatus::up());
                    }
                    for (name, status) in outcome {
                        if status.status.is_up() {
                            info.insert(name, status);
                        } else {
                            warn!("Check {} returned a down status without failing", name);
                            error.insert(name, status);
                        }
                    }
                    if !info.contains_key(key) && !error.contains_key(key) {
                        warn!("Check {} returned no status for its own key", key);
                        error.insert(
                            key.to_string(),
                            HealthIndicatorStatus::down()
                                .with_message("Health check returned no status for its key"),
                        );
                    }
                }
                Ok(Ok(Err(HealthCheckError::Failed { message, causes }))) => {
                    debug!("Check {} failed: {}", key, message);
                    if causes.is_empty() {
                        error.insert(
                            key.to_string(),
                            HealthIndicatorStatus::down().with_message(message),
                        );
                    }
                    error.extend(causes);
                }
                Ok(Ok(Err(e @ HealthCheckError::Unexpected(_)))) => {
                    error!("Check {} raised an unexpected error: {}", key, e);
                    error.insert(
                        key.to_string(),
                        HealthIndicatorStatus::down().with_message(e.to_string()),
                    );
                }
                Ok(Err(_)) => {
                    warn!("Check {} timed out after {:?}", key, self.timeout);
                    error.insert(
                        key.to_string(),
                        HealthIndicatorStatus::down().with_message("Health check timed out"),
                    );
                }
                Err(e) => {
                    error!("Check {} task join error: {}", key, e);
                    error.insert(
                        key.to_string(),
                        HealthIndicatorStatus::down()
                            .with_message(format!("Health check aborted: {}", e)),
                    );
                }
            }
        }

        info.retain(|name, _| !error.contains_key(name));

        info!(
            "Health check complete: {} up, {} down",
            info.len(),
            error.len()
        );

        let report = HealthReport::from_parts(info, error);
        if report.is_ok() {
            Ok(report)
        } else {
            Err(HealthCheckFailure { report })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{Dog, ReportStatus, Status};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Up,
        Down,
        DownWithoutFailing,
        NoRecords,
        FailedWithoutCauses,
        ForeignKeyOnly,
        Unexpected,
        Panic,
        Hang,
    }

    struct StubIndicator {
        key: String,
        outcome: Outcome,
        calls: AtomicU32,
    }

    impl StubIndicator {
        fn new(key: &str, outcome: Outcome) -> Self {
            Self {
                key: key.to_string(),
                outcome,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl HealthIndicator for StubIndicator {
        fn key(&self) -> &str {
            &self.key
        }

        async fn check(&self) -> Result<HealthIndicatorResult, HealthCheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut result = HealthIndicatorResult::new();
            match self.outcome {
                Outcome::Up => {
                    result.insert(self.key.clone(), HealthIndicatorStatus::up());
                    Ok(result)
                }
                Outcome::Down => {
                    result.insert(self.key.clone(), HealthIndicatorStatus::down());
                    Err(HealthCheckError::failed("stub down", result))
                }
                Outcome::DownWithoutFailing => {
                    result.insert(self.key.clone(), HealthIndicatorStatus::down());
                    Ok(result)
                }
                Outcome::NoRecords => Ok(result),
                Outcome::FailedWithoutCauses => {
                    Err(HealthCheckError::failed("nothing to show", result))
                }
                Outcome::ForeignKeyOnly => {
                    result.insert(format!("{}-other", self.key), HealthIndicatorStatus::up());
                    Ok(result)
                }
                Outcome::Unexpected => Err(anyhow::anyhow!("boom").into()),
                Outcome::Panic => panic!("stub panicked"),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(result)
                }
            }
        }
    }

    fn service(stubs: Vec<Arc<StubIndicator>>, limit: Duration) -> HealthCheckService {
        let indicators = stubs
            .into_iter()
            .map(|stub| stub as Arc<dyn HealthIndicator>)
            .collect();
        HealthCheckService::new(indicators, limit).unwrap()
    }

    #[tokio::test]
    async fn test_all_up_is_ok() {
        let svc = service(
            vec![
                Arc::new(StubIndicator::new("a", Outcome::Up)),
                Arc::new(StubIndicator::new("b", Outcome::Up)),
            ],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap();

        assert_eq!(report.status, ReportStatus::Ok);
        assert_eq!(report.info.len(), 2);
        assert!(report.error.is_none());
        assert_eq!(report.details, report.info);
    }

    #[tokio::test]
    async fn test_failure_does_not_short_circuit() {
        let first = Arc::new(StubIndicator::new("first", Outcome::Down));
        let second = Arc::new(StubIndicator::new("second", Outcome::Up));
        let svc = service(vec![first.clone(), second.clone()], Duration::from_secs(1));

        let failure = svc.check().await.unwrap_err();

        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        let report = failure.report;
        assert_eq!(report.status, ReportStatus::Error);
        assert!(report.info.contains_key("second"));
        assert!(report.error.as_ref().unwrap().contains_key("first"));
        assert_eq!(report.details.len(), 2);
    }

    #[tokio::test]
    async fn test_ok_with_down_record_is_an_error() {
        let svc = service(
            vec![
                Arc::new(StubIndicator::new("quiet", Outcome::DownWithoutFailing)),
                Arc::new(StubIndicator::new("fine", Outcome::Up)),
            ],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap_err().report;

        assert_eq!(report.status, ReportStatus::Error);
        assert!(!report.info.contains_key("quiet"));
        assert_eq!(report.error.as_ref().unwrap()["quiet"].status, Status::Down);
        assert_eq!(report.details["quiet"].status, Status::Down);
        assert!(report.info.contains_key("fine"));
    }

    #[tokio::test]
    async fn test_ok_without_records_is_up() {
        let svc = service(
            vec![Arc::new(StubIndicator::new("bare", Outcome::NoRecords))],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap();

        assert_eq!(report.status, ReportStatus::Ok);
        assert_eq!(report.info["bare"].status, Status::Up);
        assert_eq!(report.details["bare"].status, Status::Up);
    }

    #[tokio::test]
    async fn test_failed_without_causes_reports_message() {
        let svc = service(
            vec![Arc::new(StubIndicator::new("empty", Outcome::FailedWithoutCauses))],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap_err().report;

        let error = report.error.unwrap();
        assert_eq!(error["empty"].status, Status::Down);
        assert_eq!(error["empty"].data["message"], json!("nothing to show"));
        assert!(report.info.is_empty());
        assert!(report.details.contains_key("empty"));
    }

    #[tokio::test]
    async fn test_check_missing_its_own_key_is_down() {
        let svc = service(
            vec![Arc::new(StubIndicator::new("mine", Outcome::ForeignKeyOnly))],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap_err().report;

        assert_eq!(report.status, ReportStatus::Error);
        let error = report.error.unwrap();
        assert_eq!(error["mine"].status, Status::Down);
        assert_eq!(
            error["mine"].data["message"],
            json!("Health check returned no status for its key")
        );
        assert_eq!(report.info["mine-other"].status, Status::Up);
        assert!(report.details.contains_key("mine"));
    }

    #[tokio::test]
    async fn test_unexpected_error_becomes_down_status() {
        let svc = service(
            vec![
                Arc::new(StubIndicator::new("weird", Outcome::Unexpected)),
                Arc::new(StubIndicator::new("fine", Outcome::Up)),
            ],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap_err().report;
        let error = report.error.unwrap();

        assert_eq!(error["weird"].status, Status::Down);
        assert_eq!(
            error["weird"].data["message"],
            json!("Unexpected health check error: boom")
        );
        assert!(report.info.contains_key("fine"));
    }

    #[tokio::test]
    async fn test_panicking_check_becomes_down_status() {
        let svc = service(
            vec![
                Arc::new(StubIndicator::new("panics", Outcome::Panic)),
                Arc::new(StubIndicator::new("fine", Outcome::Up)),
            ],
            Duration::from_secs(1),
        );

        let report = svc.check().await.unwrap_err().report;

        assert_eq!(report.details["panics"].status, Status::Down);
        assert_eq!(report.details["fine"].status, Status::Up);
    }

    #[tokio::test]
    async fn test_timeout_becomes_down_status() {
        let svc = service(
            vec![Arc::new(StubIndicator::new("slow", Outcome::Hang))],
            Duration::from_millis(50),
        );

        let report = svc.check().await.unwrap_err().report;

        assert_eq!(
            report.error.unwrap()["slow"].data["message"],
            json!("Health check timed out")
        );
    }

    #[tokio::test]
    async fn test_dog_check_through_aggregator() {
        let dogs = vec![Dog::new("Fido", "goodboy"), Dog::new("Rex", "badboy")];
        let indicators: Vec<Arc<dyn HealthIndicator>> = vec![
            Arc::new(StubIndicator::new("ping", Outcome::Up)),
            Arc::new(DogHealthIndicator::new("dog", dogs)),
        ];
        let svc = HealthCheckService::new(indicators, Duration::from_secs(1)).unwrap();

        let report = svc.check().await.unwrap_err().report;

        assert_eq!(
            serde_json::to_value(&report.error).unwrap(),
            json!({ "dog": { "status": "down", "badBoys": 1 } })
        );
        assert!(report.info.contains_key("ping"));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let indicators: Vec<Arc<dyn HealthIndicator>> = vec![
            Arc::new(StubIndicator::new("dog", Outcome::Up)),
            Arc::new(StubIndicator::new("dog", Outcome::Down)),
        ];

        let err = HealthCheckService::new(indicators, Duration::from_secs(1)).err();
        assert_eq!(err, Some(AggregatorError::DuplicateKey("dog".to_string())));
    }

    #[test]
    fn test_from_config_orders_ping_then_dog() {
        let svc = HealthCheckService::from_config(&HealthCheckConfig::default()).unwrap();

        assert_eq!(svc.keys(), vec!["nestjs-docs", "dog"]);
    }

    #[tokio::test]
    async fn test_empty_service_is_ok() {
        let svc = HealthCheckService::new(Vec::new(), Duration::from_secs(1)).unwrap();

        let report = svc.check().await.unwrap();
        assert!(report.details.is_empty());
    }

    fn outcome_strategy() -> impl Strategy<Value = Outcome> {
        prop_oneof![
            Just(Outcome::Up),
            Just(Outcome::Down),
            Just(Outcome::DownWithoutFailing),
            Just(Outcome::NoRecords),
            Just(Outcome::FailedWithoutCauses),
            Just(Outcome::Unexpected),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_report_partitions_details(
            checks in proptest::collection::btree_map("[a-z]{1,6}", outcome_strategy(), 0..8)
        ) {
            let stubs: Vec<Arc<StubIndicator>> = checks
                .iter()
                .map(|(key, outcome)| Arc::new(StubIndicator::new(key, *outcome)))
                .collect();
            let svc = service(stubs, Duration::from_secs(1));

            let runtime = tokio::runtime::Runtime::new().unwrap();
            let report = match runtime.block_on(svc.check()) {
                Ok(report) => report,
                Err(failure) => failure.report,
            };

            let error = report.error.clone().unwrap_or_default();
            let any_failed = checks
                .values()
                .any(|o| !matches!(o, Outcome::Up | Outcome::NoRecords));

            prop_assert_eq!(report.details.len(), checks.len());
            prop_assert_eq!(report.info.len() + error.len(), report.details.len());
            for key in report.info.keys() {
                prop_assert!(!error.contains_key(key));
                prop_assert!(report.details.contains_key(key));
            }
            for key in error.keys() {
                prop_assert!(report.details.contains_key(key));
            }
            prop_assert_eq!(report.status == ReportStatus::Ok, !any_failed);
            prop_assert_eq!(report.error.is_some(), any_failed);
        }
    }
}
