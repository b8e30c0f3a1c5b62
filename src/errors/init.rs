use thiserror::Error;

#[derive(Error, Debug)]
pub enum InitializationError {
    #[error("Logging initialization error: {0}")]
    Logging(String),

    #[error("HTTP client initialization error: {0}")]
    HttpClient(String),

    #[error("HTTP server initialization error: {0}")]
    Server(String),
}

impl InitializationError {
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    pub fn http_client(msg: impl Into<String>) -> Self {
        Self::HttpClient(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}
