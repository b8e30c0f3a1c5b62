use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Label attached to every probe of a bounded run
    pub query: String,
    /// Number of probes in one run
    pub max_requests: u32,
    /// Pause between two probes
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: "test search query site:example.com".to_string(),
            max_requests: 1,
            delay: Duration::from_secs(1),
        }
    }
}
