use thiserror::Error;

/// Error types for the refund-notify library
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl NotifyError {
    /// Whether this error means the transport can never be built for the
    /// current configuration, as opposed to a failed network attempt.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            NotifyError::UrlParseError(_) | NotifyError::InvalidEndpoint(_)
        )
    }
}
