use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::classify::{classify, Verdict};

/// HTTP status of a probe, or `TIMEOUT` when nothing came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Code(u16),
    Timeout,
}

impl ProbeStatus {
    const TIMEOUT: &'static str = "TIMEOUT";
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Code(code) => write!(f, "{}", code),
            ProbeStatus::Timeout => write!(f, "{}", Self::TIMEOUT),
        }
    }
}

impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProbeStatus::Code(code) => serializer.serialize_u16(*code),
            ProbeStatus::Timeout => serializer.serialize_str(Self::TIMEOUT),
        }
    }
}

impl<'de> Deserialize<'de> for ProbeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u16),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(ProbeStatus::Code(code)),
            Raw::Text(text) if text == Self::TIMEOUT => Ok(ProbeStatus::Timeout),
            Raw::Text(text) => Err(serde::de::Error::custom(format!(
                "invalid probe status: {}",
                text
            ))),
        }
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub success: bool,
    pub status_code: ProbeStatus,
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<serde_json::Value>,
}

impl ProbeResult {
    /// Build a result from a received response
    pub fn from_response(status: u16, body: &str) -> Self {
        let verdict = classify(Some((status, body)));

        if verdict.is_success() {
            let response_body = serde_json::from_str(body)
                .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));

            return Self {
                success: true,
                status_code: ProbeStatus::Code(status),
                blocked: false,
                error_message: None,
                response_body: Some(response_body),
            };
        }

        Self {
            success: false,
            status_code: ProbeStatus::Code(status),
            blocked: verdict == Verdict::Blocked,
            error_message: Some(format!("Request failed with status code {}", status)),
            response_body: None,
        }
    }

    /// Build a result for a request that never got a response
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: ProbeStatus::Timeout,
            blocked: false,
            error_message: Some(error.into()),
            response_body: None,
        }
    }
}
