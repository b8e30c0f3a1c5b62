use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::ProbeError;

use super::{ProbeResult, Prober};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Ok,
    Blocked,
    Unreachable,
    Fail(&'static str),
    /// Succeeds after the given latency
    Slow(Duration),
}

/// When one call started and, once it returned, when it ended
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallSpan {
    pub start: Instant,
    pub end: Option<Instant>,
}

/// Plays back a fixed sequence of outcomes, then succeeds forever
pub(crate) struct ScriptedProber {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    spans: Mutex<Vec<CallSpan>>,
    fallback: Step,
    ip: String,
}

impl ScriptedProber {
    pub(crate) fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: AtomicUsize::new(0),
            spans: Mutex::new(Vec::new()),
            fallback: Step::Ok,
            ip: "198.51.100.1".to_string(),
        }
    }

    pub(crate) fn succeeding() -> Self {
        Self::new([])
    }

    /// Succeeds `n - 1` times, then fails
    pub(crate) fn failing_at(n: usize, message: &'static str) -> Self {
        let mut script = vec![Step::Ok; n.saturating_sub(1)];
        script.push(Step::Fail(message));
        Self::new(script)
    }

    /// Every call takes `latency` before succeeding
    pub(crate) fn slow(latency: Duration) -> Self {
        Self {
            fallback: Step::Slow(latency),
            ..Self::new([])
        }
    }

    pub(crate) fn spans(&self) -> Vec<CallSpan> {
        self.spans.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn ip(&self) -> &str {
        &self.ip
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _label: &str) -> Result<ProbeResult, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = {
            let mut spans = self.spans.lock().unwrap();
            spans.push(CallSpan {
                start: Instant::now(),
                end: None,
            });
            spans.len() - 1
        };

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        if let Step::Slow(latency) = step {
            sleep(latency).await;
        }
        self.spans.lock().unwrap()[index].end = Some(Instant::now());

        match step {
            Step::Ok | Step::Slow(_) => Ok(ProbeResult::from_response(
                200,
                r#"{"origin": "198.51.100.1"}"#,
            )),
            Step::Blocked => Ok(ProbeResult::from_response(429, "Too Many Requests")),
            Step::Unreachable => Ok(ProbeResult::unreachable("connection refused")),
            Step::Fail(message) => Err(ProbeError::other(message)),
        }
    }

    async fn current_ip(&self) -> String {
        self.ip.clone()
    }
}
