use std::{collections::VecDeque, sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::{
    sync::{watch, Mutex},
    time::{sleep, sleep_until, timeout, Instant},
};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{
    config::StressConfig,
    generate_run_id,
    probe::Prober,
    records::{CrashReport, LogEntry},
    store::ResultStore,
    ProbeError,
};

use super::state::{StopReason, StressState, StressStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { run_id: u64, initial_ip: String },
    /// A loop is already active, nothing was changed
    AlreadyRunning { request_count: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { request_count: u64 },
    NotRunning { request_count: u64 },
}

/// Owns the single stress loop of the process
pub struct StressController {
    config: StressConfig,
    prober: Arc<dyn Prober>,
    store: Arc<ResultStore>,
    state: Arc<Mutex<StressState>>,
}

impl StressController {
    const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(config: StressConfig, prober: Arc<dyn Prober>, store: Arc<ResultStore>) -> Self {
        Self {
            config,
            prober,
            store,
            state: Arc::new(Mutex::new(StressState::new())),
        }
    }

    /// Start a new loop unless one is already running
    pub async fn start(&self) -> StartOutcome {
        let (run_id, stop_rx) = {
            let mut state = self.state.lock().await;
            if state.is_running() {
                info!(
                    "Stress loop already running at request #{}",
                    state.request_count
                );
                return StartOutcome::AlreadyRunning {
                    request_count: state.request_count,
                };
            }

            let run_id = generate_run_id();
            (run_id, state.begin(run_id))
        };

        info!(run_id, "Starting stress loop");
        let initial_ip = self.prober.current_ip().await;

        let (start_time, is_current) = {
            let mut state = self.state.lock().await;
            let is_current = state.is_current(run_id);
            if is_current {
                state.initial_ip = Some(initial_ip.clone());
            }
            (
                state.started_at.unwrap_or_else(OffsetDateTime::now_utc),
                is_current,
            )
        };

        if !is_current {
            debug!(run_id, "Stress loop stopped before its first request");
        }

        let run = StressRun {
            run_id,
            initial_ip: initial_ip.clone(),
            start_time,
            config: self.config.clone(),
            prober: Arc::clone(&self.prober),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
        };

        let task = tokio::spawn(
            run.execute(stop_rx)
                .instrument(info_span!("stress_run", run_id)),
        );

        {
            let mut state = self.state.lock().await;
            if state.run_id == Some(run_id) {
                state.task = Some(task);
            }
        }

        StartOutcome::Started { run_id, initial_ip }
    }

    /// Stop the running loop. A step already in flight finishes first.
    pub async fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock().await;
        let request_count = state.request_count;

        if !state.is_running() {
            return StopOutcome::NotRunning { request_count };
        }

        state.finish(StopReason::Stopped);
        info!("Stress loop stopped at request #{}", request_count);

        StopOutcome::Stopped { request_count }
    }

    pub async fn status(&self) -> StressStatus {
        self.state.lock().await.status()
    }

    /// Stop any running loop and wait for its task to exit
    pub async fn shutdown(&self) {
        let task = {
            let mut state = self.state.lock().await;
            if state.is_running() {
                state.finish(StopReason::Shutdown);
            }
            state.task.take()
        };

        let Some(task) = task else {
            return;
        };

        match timeout(Self::SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => debug!("Stress task finished"),
            Ok(Err(e)) => error!("Stress task failed during shutdown: {}", e),
            Err(_) => error!(
                "Timeout waiting for stress task after {:?}",
                Self::SHUTDOWN_TIMEOUT
            ),
        }
    }
}

/// Everything one loop instance needs, moved into its task
struct StressRun {
    run_id: u64,
    initial_ip: String,
    start_time: OffsetDateTime,
    config: StressConfig,
    prober: Arc<dyn Prober>,
    store: Arc<ResultStore>,
    state: Arc<Mutex<StressState>>,
}

impl StressRun {
    /// Requests carried in a crash report
    const RECENT_REQUESTS: usize = 20;

    async fn execute(self, mut stop_rx: watch::Receiver<bool>) {
        let deadline = Instant::now() + self.config.max_duration;
        let mut recent = VecDeque::with_capacity(Self::RECENT_REQUESTS);

        loop {
            if Instant::now() >= deadline {
                self.finish(StopReason::TimedOut).await;
                info!(
                    "Stress loop stopped after {:?}",
                    self.config.max_duration
                );
                break;
            }

            let Some(request_number) = self.state.lock().await.next_request(self.run_id) else {
                debug!("Stress loop no longer active");
                break;
            };

            info!("Stress request #{}", request_number);

            match self.step(request_number).await {
                Ok(entry) => {
                    if recent.len() == Self::RECENT_REQUESTS {
                        recent.pop_front();
                    }
                    recent.push_back(entry);
                }
                Err(e) => {
                    self.crash(request_number, e, recent).await;
                    break;
                }
            }

            tokio::select! {
                _ = sleep(self.config.delay) => {}
                _ = sleep_until(deadline) => {}
                _ = stop_rx.changed() => {
                    debug!("Stress loop received stop signal");
                    break;
                }
            }
        }

        debug!("Stress loop exited");
    }

    async fn step(&self, request_number: u64) -> Result<LogEntry, ProbeError> {
        let started = Instant::now();
        let result = self.prober.probe(&self.config.label).await?;

        if !result.success {
            warn!(
                "Stress request #{} failed with status {}",
                request_number, result.status_code
            );
        }

        let entry = LogEntry::new(request_number, self.initial_ip.as_str(), result)
            .with_response_time(started.elapsed());
        self.store.record(&entry).await;

        Ok(entry)
    }

    async fn finish(&self, reason: StopReason) {
        let mut state = self.state.lock().await;
        if state.is_current(self.run_id) {
            state.finish(reason);
        }
    }

    /// Persist the crash report, then release the run to Idle
    async fn crash(
        &self,
        request_number: u64,
        err: ProbeError,
        recent: VecDeque<LogEntry>,
    ) {
        error!(
            "Fatal error on stress request #{}: {}",
            request_number, err
        );

        let request_count = {
            let state = self.state.lock().await;
            if state.is_current(self.run_id) {
                state.request_count
            } else {
                request_number
            }
        };

        let report = CrashReport {
            run_id: self.run_id,
            start_time: self.start_time,
            initial_ip: self.initial_ip.clone(),
            request_count,
            crashed_at_request: request_number,
            crash_time: OffsetDateTime::now_utc(),
            error: err.to_string(),
            recent_requests: recent.into(),
        };

        if let Err(e) = self.store.write_crash_report(&report).await {
            error!("Failed to save crash report: {}", e);
        }

        self.finish(StopReason::Crashed).await;
    }
}
