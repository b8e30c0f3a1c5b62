use std::sync::Arc;

use time::OffsetDateTime;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::{
    config::DriverConfig,
    probe::Prober,
    records::{LogEntry, RunOutcome, RunReport, RunSummary},
    store::ResultStore,
    ProbeError,
};

/// Runs a bounded sequence of probes and summarizes it
pub struct TestDriver {
    config: DriverConfig,
    instance: String,
    prober: Arc<dyn Prober>,
    store: Arc<ResultStore>,
}

impl TestDriver {
    pub fn new(
        config: DriverConfig,
        instance: impl Into<String>,
        prober: Arc<dyn Prober>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            config,
            instance: instance.into(),
            prober,
            store,
        }
    }

    /// Probe up to `max_requests` times, stopping at the first blocked answer.
    ///
    /// The finished report also overwrites the results snapshot.
    pub async fn run(&self) -> Result<RunReport, ProbeError> {
        let max_requests = self.config.max_requests;
        let started = Instant::now();
        let start_time = OffsetDateTime::now_utc();

        info!("Starting bounded probe run");
        let ip = self.prober.current_ip().await;
        info!(query = %self.config.query, "Current IP: {}", ip);

        let mut requests = Vec::new();
        let mut outcome = RunOutcome::Completed;

        for i in 1..=max_requests {
            info!("Request {}/{}", i, max_requests);

            let request_started = Instant::now();
            let result = self.prober.probe(&self.config.query).await?;
            let entry = LogEntry::new(u64::from(i), ip.as_str(), result)
                .with_response_time(request_started.elapsed());

            self.store.record(&entry).await;
            let blocked = entry.result.blocked;
            requests.push(entry);

            if blocked {
                warn!("Blocked on request {}, IP needs rotation", i);
                outcome = RunOutcome::Blocked;
                break;
            }

            if i < max_requests {
                debug!("Waiting {:?}", self.config.delay);
                sleep(self.config.delay).await;
            }
        }

        let summary = RunSummary::from_entries(&requests, started.elapsed());
        info!(
            "Run finished: {}/{} successful, {} blocked, {}% success rate, {} ms",
            summary.successful_requests,
            summary.total_requests,
            summary.blocked_requests,
            summary.success_rate,
            summary.test_duration_ms
        );

        let report = RunReport {
            start_time,
            initial_ip: ip,
            instance: self.instance.clone(),
            outcome,
            requests,
            summary,
        };

        if let Err(e) = self.store.write_results(&report).await {
            error!("Failed to save run results: {}", e);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::StorageConfig,
        probe::testing::{ScriptedProber, Step},
    };
    use tempfile::{tempdir, TempDir};

    fn driver(prober: Arc<ScriptedProber>, max_requests: u32) -> (TestDriver, Arc<ResultStore>, TempDir) {
        let dir = tempdir().unwrap();
        let store = Arc::new(ResultStore::new(StorageConfig::in_dir(dir.path())));
        let config = DriverConfig {
            max_requests,
            delay: Duration::from_secs(1),
            ..Default::default()
        };
        let driver = TestDriver::new(config, "test", prober, Arc::clone(&store));
        (driver, store, dir)
    }

    async fn log_lines(store: &ResultStore) -> usize {
        store
            .read_log()
            .await
            .unwrap()
            .map(|content| content.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_all_requests() {
        let prober = Arc::new(ScriptedProber::succeeding());
        let (driver, store, _dir) = driver(Arc::clone(&prober), 3);

        let report = driver.run().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.requests.len(), 3);
        assert_eq!(report.summary.total_requests, 3);
        assert_eq!(report.summary.successful_requests, 3);
        assert_eq!(report.summary.success_rate, 100.0);
        assert!(report.summary.test_duration_ms >= 2000);
        assert_eq!(report.initial_ip, prober.ip());
        assert_eq!(prober.calls(), 3);

        let numbers: Vec<u64> = report.requests.iter().map(|e| e.request_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        assert_eq!(log_lines(&store).await, 3);
        let snapshot = store.read_results().await.unwrap().unwrap();
        assert_eq!(snapshot["summary"]["totalRequests"], 3);
        assert_eq!(snapshot["outcome"], "completed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_block() {
        let prober = Arc::new(ScriptedProber::new([Step::Ok, Step::Blocked, Step::Ok]));
        let (driver, store, _dir) = driver(Arc::clone(&prober), 5);

        let report = driver.run().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Blocked);
        assert_eq!(report.requests.len(), 2);
        assert_eq!(report.summary.blocked_requests, 1);
        assert_eq!(report.summary.success_rate, 50.0);
        assert!(report.requests[1].result.blocked);
        assert_eq!(prober.calls(), 2);
        assert_eq!(log_lines(&store).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_request_limit_does_not_preallocate() {
        let prober = Arc::new(ScriptedProber::new([Step::Blocked]));
        let (driver, _store, _dir) = driver(Arc::clone(&prober), u32::MAX);

        let report = driver.run().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Blocked);
        assert_eq!(report.requests.len(), 1);
        assert_eq!(prober.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_does_not_stop() {
        let prober = Arc::new(ScriptedProber::new([Step::Unreachable, Step::Ok]));
        let (driver, _store, _dir) = driver(Arc::clone(&prober), 2);

        let report = driver.run().await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.summary.total_requests, 2);
        assert_eq!(report.summary.successful_requests, 1);
        assert_eq!(report.summary.blocked_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_probe_error_propagates() {
        let prober = Arc::new(ScriptedProber::failing_at(2, "probe exploded"));
        let (driver, store, _dir) = driver(Arc::clone(&prober), 3);

        let err = driver.run().await.unwrap_err();
        assert!(err.to_string().contains("probe exploded"));
        assert_eq!(log_lines(&store).await, 1);
        assert_eq!(store.read_results().await.unwrap(), None);
    }
}
