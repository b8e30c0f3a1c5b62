use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Endpoint hit by every probe
    pub target_url: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Pool of user agents, one is picked at random per probe
    pub user_agents: Vec<String>,

    /// Value of the Accept header
    pub accept: String,

    /// Value of the Accept-Language header
    pub accept_language: String,

    /// Service answering with the caller's public IP as `{"ip": "..."}`
    pub ip_lookup_url: String,

    #[serde(with = "humantime_serde")]
    pub ip_lookup_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://httpbin.org/ip".to_string(),
            timeout: Duration::from_secs(10),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            ],
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "uk-UA,uk;q=0.9,en;q=0.8".to_string(),
            ip_lookup_url: "https://api.ipify.org?format=json".to_string(),
            ip_lookup_timeout: Duration::from_secs(5),
        }
    }
}
