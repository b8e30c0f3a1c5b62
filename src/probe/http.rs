use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{
    header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{config::ProbeConfig, InitializationError, ProbeError};

use super::{ProbeResult, Prober, UNKNOWN_IP};

#[derive(Debug, Deserialize)]
struct IpResponse {
    ip: String,
}

/// Probes the configured target over HTTP
pub struct HttpProber {
    client: Client,
    config: ProbeConfig,
}

impl HttpProber {
    pub fn new(config: &ProbeConfig) -> Result<Self, InitializationError> {
        let client = Client::builder()
            .build()
            .map_err(|e| InitializationError::http_client(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn pick_user_agent(&self) -> &str {
        self.config
            .user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }

    async fn lookup_ip(&self) -> Result<String, reqwest::Error> {
        let response = self
            .client
            .get(&self.config.ip_lookup_url)
            .timeout(self.config.ip_lookup_timeout)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<IpResponse>().await?.ip)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, label: &str) -> Result<ProbeResult, ProbeError> {
        let url = &self.config.target_url;
        let user_agent = self.pick_user_agent();

        debug!(label, user_agent, "Probing {}", url);

        let request = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, &self.config.accept)
            .header(ACCEPT_LANGUAGE, &self.config.accept_language)
            .header("Upgrade-Insecure-Requests", "1")
            .timeout(self.config.timeout);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(ProbeError::request(url, e)),
            Err(e) => {
                debug!("No response from {}: {}", url, e);
                return Ok(ProbeResult::unreachable(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => Ok(ProbeResult::from_response(status, &body)),
            Err(e) => {
                debug!("Response body from {} lost: {}", url, e);
                Ok(ProbeResult::unreachable(e.to_string()))
            }
        }
    }

    async fn current_ip(&self) -> String {
        match self.lookup_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Failed to get current IP: {}", e);
                UNKNOWN_IP.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    use super::*;
    use crate::probe::ProbeStatus;

    async fn spawn_target() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { Json(json!({"origin": "10.0.0.1"})) }))
            .route(
                "/limited",
                get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
            )
            .route(
                "/unavailable",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "client blocked") }),
            )
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, "nothing here") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/ip", get(|| async { Json(json!({"ip": "203.0.113.7"})) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn prober(base: &str, path: &str) -> HttpProber {
        let config = ProbeConfig {
            target_url: format!("{}{}", base, path),
            timeout: Duration::from_millis(300),
            ip_lookup_url: format!("{}/ip", base),
            ..Default::default()
        };
        HttpProber::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_probe_success() {
        let base = spawn_target().await;
        let result = prober(&base, "/ok").probe("test").await.unwrap();

        assert!(result.success);
        assert!(!result.blocked);
        assert_eq!(result.status_code, ProbeStatus::Code(200));
        assert_eq!(result.response_body, Some(json!({"origin": "10.0.0.1"})));
    }

    #[tokio::test]
    async fn test_probe_blocked_statuses() {
        let base = spawn_target().await;

        let limited = prober(&base, "/limited").probe("test").await.unwrap();
        assert!(limited.blocked);
        assert_eq!(limited.status_code, ProbeStatus::Code(429));

        let unavailable = prober(&base, "/unavailable").probe("test").await.unwrap();
        assert!(unavailable.blocked);
        assert!(!unavailable.success);
    }

    #[tokio::test]
    async fn test_probe_plain_failure() {
        let base = spawn_target().await;
        let result = prober(&base, "/missing").probe("test").await.unwrap();

        assert!(!result.success);
        assert!(!result.blocked);
        assert_eq!(result.status_code, ProbeStatus::Code(404));
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let base = spawn_target().await;
        let result = prober(&base, "/slow").probe("test").await.unwrap();

        assert!(!result.success);
        assert!(!result.blocked);
        assert_eq!(result.status_code, ProbeStatus::Timeout);
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn test_invalid_url_is_fatal() {
        let config = ProbeConfig {
            target_url: "not a url".to_string(),
            ..Default::default()
        };
        let prober = HttpProber::new(&config).unwrap();

        assert!(matches!(
            prober.probe("test").await,
            Err(ProbeError::Request { .. })
        ));
    }

    #[tokio::test]
    async fn test_current_ip() {
        let base = spawn_target().await;
        assert_eq!(prober(&base, "/ok").current_ip().await, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_current_ip_unknown_on_failure() {
        let base = spawn_target().await;
        let config = ProbeConfig {
            ip_lookup_url: format!("{}/missing", base),
            ..Default::default()
        };
        let prober = HttpProber::new(&config).unwrap();

        assert_eq!(prober.current_ip().await, UNKNOWN_IP);
    }
}
