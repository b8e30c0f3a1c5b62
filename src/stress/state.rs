use serde::Serialize;
use time::OffsetDateTime;
use tokio::{sync::watch, task::JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// External stop request
    Stopped,
    /// Lifetime ceiling reached
    TimedOut,
    /// Fatal error in a step
    Crashed,
    /// Process shutting down
    Shutdown,
}

/// Point-in-time view of the loop, safe to hand out
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressStatus {
    pub running: bool,
    pub request_count: u64,
    pub run_id: Option<u64>,
    pub initial_ip: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub last_stop_reason: Option<StopReason>,
}

/// Owned by the controller, only ever touched under its lock
#[derive(Debug)]
pub(super) struct StressState {
    pub phase: Phase,
    pub run_id: Option<u64>,
    pub request_count: u64,
    pub initial_ip: Option<String>,
    pub started_at: Option<OffsetDateTime>,
    pub last_stop_reason: Option<StopReason>,
    pub stop_tx: Option<watch::Sender<bool>>,
    pub task: Option<JoinHandle<()>>,
}

impl StressState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            run_id: None,
            request_count: 0,
            initial_ip: None,
            started_at: None,
            last_stop_reason: None,
            stop_tx: None,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// True while `run_id` owns the running loop
    pub fn is_current(&self, run_id: u64) -> bool {
        self.is_running() && self.run_id == Some(run_id)
    }

    /// Enter Running for a fresh run, returning its stop signal receiver
    pub fn begin(&mut self, run_id: u64) -> watch::Receiver<bool> {
        let (stop_tx, stop_rx) = watch::channel(false);

        self.phase = Phase::Running;
        self.run_id = Some(run_id);
        self.request_count = 0;
        self.initial_ip = None;
        self.started_at = Some(OffsetDateTime::now_utc());
        self.last_stop_reason = None;
        self.stop_tx = Some(stop_tx);
        self.task = None;

        stop_rx
    }

    /// Claim the next request number for `run_id`, `None` once it is no longer current
    pub fn next_request(&mut self, run_id: u64) -> Option<u64> {
        if !self.is_current(run_id) {
            return None;
        }
        self.request_count += 1;
        Some(self.request_count)
    }

    /// Back to Idle, signalling the loop task
    pub fn finish(&mut self, reason: StopReason) {
        self.phase = Phase::Idle;
        self.last_stop_reason = Some(reason);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }

    pub fn status(&self) -> StressStatus {
        StressStatus {
            running: self.is_running(),
            request_count: self.request_count,
            run_id: self.run_id,
            initial_ip: self.initial_ip.clone(),
            started_at: self.started_at,
            last_stop_reason: self.last_stop_reason,
        }
    }
}
