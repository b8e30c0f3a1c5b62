use thiserror::Error;

/// Failures of the probe step itself.
///
/// Unreachable hosts, timeouts and non-2xx answers are outcomes and end up in a
/// `ProbeResult`; only errors that prevent producing an outcome land here.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to build request for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Probe failed: {0}")]
    Other(String),
}

impl ProbeError {
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    pub fn other(details: impl Into<String>) -> Self {
        Self::Other(details.into())
    }
}
