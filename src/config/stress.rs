use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Label attached to every stress probe
    pub label: String,
    /// Pause measured from the end of one step to the start of the next
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Hard ceiling on the lifetime of a single loop
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            label: "stress test".to_string(),
            delay: Duration::from_secs(1),
            max_duration: Duration::from_secs(600),
        }
    }
}
