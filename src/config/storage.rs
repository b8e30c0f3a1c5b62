use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Append-only probe log, one `<timestamp> | <json>` line per probe
    pub log_file: PathBuf,
    /// Snapshot of the last bounded run
    pub results_file: PathBuf,
    /// Snapshot written when a stress loop dies
    pub crash_report_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("ip_rotation_log.txt"),
            results_file: PathBuf::from("test_results.json"),
            crash_report_file: PathBuf::from("crash_report.json"),
        }
    }
}

impl Config {
    /// Same file names, rooted in `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let defaults = Self::default();
        Self {
            log_file: dir.join(defaults.log_file),
            results_file: dir.join(defaults.results_file),
            crash_report_file: dir.join(defaults.crash_report_file),
        }
    }
}
