use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::probe::ProbeResult;

/// One probe as written to the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub request_number: u64,
    pub ip: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(flatten)]
    pub result: ProbeResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

impl LogEntry {
    pub fn new(request_number: u64, ip: impl Into<String>, result: ProbeResult) -> Self {
        Self {
            request_number,
            ip: ip.into(),
            timestamp: OffsetDateTime::now_utc(),
            result,
            response_time_ms: None,
        }
    }

    pub fn with_response_time(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = Some(elapsed.as_millis() as u64);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub blocked_requests: usize,
    /// Percentage, rounded to two decimals
    pub success_rate: f64,
    pub test_duration_ms: u64,
}

impl RunSummary {
    pub fn from_entries(entries: &[LogEntry], elapsed: Duration) -> Self {
        let total_requests = entries.len();
        let successful_requests = entries.iter().filter(|e| e.result.success).count();
        let blocked_requests = entries.iter().filter(|e| e.result.blocked).count();

        let success_rate = if total_requests == 0 {
            0.0
        } else {
            let rate = successful_requests as f64 / total_requests as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        };

        Self {
            total_requests,
            successful_requests,
            blocked_requests,
            success_rate,
            test_duration_ms: elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every configured probe was issued
    Completed,
    /// Stopped early after a blocked probe
    Blocked,
}

/// Full result of a bounded run, also persisted as the results snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub initial_ip: String,
    pub instance: String,
    pub outcome: RunOutcome,
    pub requests: Vec<LogEntry>,
    pub summary: RunSummary,
}

/// Written once when a stress loop dies on a fatal error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashReport {
    pub run_id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    pub initial_ip: String,
    pub request_count: u64,
    pub crashed_at_request: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub crash_time: OffsetDateTime,
    pub error: String,
    /// Tail of the run's completed requests, oldest first
    #[serde(default)]
    pub recent_requests: Vec<LogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(n: u64, status: u16) -> LogEntry {
        LogEntry::new(n, "192.0.2.1", ProbeResult::from_response(status, "{}"))
    }

    #[test]
    fn test_summary_counts() {
        let entries = vec![entry(1, 200), entry(2, 200), entry(3, 403)];
        let summary = RunSummary::from_entries(&entries, Duration::from_millis(2500));

        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.successful_requests, 2);
        assert_eq!(summary.blocked_requests, 1);
        assert_eq!(summary.success_rate, 66.67);
        assert_eq!(summary.test_duration_ms, 2500);
    }

    #[test]
    fn test_summary_empty() {
        let summary = RunSummary::from_entries(&[], Duration::ZERO);
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_log_entry_shape() {
        let entry = entry(4, 429).with_response_time(Duration::from_millis(87));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["requestNumber"], json!(4));
        assert_eq!(value["ip"], json!("192.0.2.1"));
        assert_eq!(value["statusCode"], json!(429));
        assert_eq!(value["blocked"], json!(true));
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["responseTimeMs"], json!(87));
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));

        let parsed: LogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(serde_json::to_value(RunOutcome::Blocked).unwrap(), json!("blocked"));
        assert_eq!(
            serde_json::to_value(RunOutcome::Completed).unwrap(),
            json!("completed")
        );
    }
}
