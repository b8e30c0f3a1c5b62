use std::path::Path;

use serde::Serialize;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, error, info};

use crate::{
    config::StorageConfig,
    records::{CrashReport, LogEntry, RunReport},
    utils::format_timestamp,
    IoOperation, StorageError,
};

/// Flat files backing the probe log and the two JSON snapshots
#[derive(Debug, Clone)]
pub struct ResultStore {
    config: StorageConfig,
}

impl ResultStore {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn log_path(&self) -> &Path {
        &self.config.log_file
    }

    pub fn results_path(&self) -> &Path {
        &self.config.results_file
    }

    pub fn crash_report_path(&self) -> &Path {
        &self.config.crash_report_file
    }

    /// Render one log line: `<timestamp> | <json>\n`
    pub fn format_line(entry: &LogEntry) -> Result<String, serde_json::Error> {
        Ok(format!(
            "{} | {}\n",
            format_timestamp(entry.timestamp),
            serde_json::to_string(entry)?
        ))
    }

    pub async fn append_entry(&self, entry: &LogEntry) -> Result<(), StorageError> {
        let path = self.log_path();
        let line = Self::format_line(entry).map_err(|e| StorageError::serialization(path, e))?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StorageError::io(IoOperation::Create, path, e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StorageError::io(IoOperation::Append, path, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::io(IoOperation::Append, path, e))?;

        Ok(())
    }

    /// Best-effort append, failures are reported and swallowed
    pub async fn record(&self, entry: &LogEntry) {
        match self.append_entry(entry).await {
            Ok(()) => debug!(
                request_number = entry.request_number,
                success = entry.result.success,
                blocked = entry.result.blocked,
                status = %entry.result.status_code,
                "Probe logged"
            ),
            Err(e) => error!("Failed to write probe log: {}", e),
        }
    }

    pub async fn write_results(&self, report: &RunReport) -> Result<(), StorageError> {
        write_snapshot(&self.config.results_file, report).await
    }

    pub async fn write_crash_report(&self, report: &CrashReport) -> Result<(), StorageError> {
        write_snapshot(&self.config.crash_report_file, report).await?;
        info!(
            "Crash report saved to {}",
            self.config.crash_report_file.display()
        );
        Ok(())
    }

    /// Raw log content, `None` when nothing was logged yet
    pub async fn read_log(&self) -> Result<Option<String>, StorageError> {
        read_optional(&self.config.log_file).await
    }

    pub async fn read_results(&self) -> Result<Option<serde_json::Value>, StorageError> {
        read_json(&self.config.results_file).await
    }

    pub async fn read_crash_report(&self) -> Result<Option<serde_json::Value>, StorageError> {
        read_json(&self.config.crash_report_file).await
    }
}

async fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let content =
        serde_json::to_string_pretty(value).map_err(|e| StorageError::serialization(path, e))?;

    fs::write(path, content)
        .await
        .map_err(|e| StorageError::io(IoOperation::Write, path, e))
}

async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(IoOperation::Read, path, e)),
    }
}

async fn read_json(path: &Path) -> Result<Option<serde_json::Value>, StorageError> {
    match read_optional(path).await? {
        Some(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::serialization(path, e)),
        None => Ok(None),
    }
}
