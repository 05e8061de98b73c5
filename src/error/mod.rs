use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProspectorError {
    /// Network/connectivity issues (timeouts, connection resets)
    #[error("Network Error: {0}")]
    NetworkError(String),

    /// Provider-signaled throttling (HTTP 429 and friends)
    #[error("Rate Limited: {0}")]
    RateLimited(String),

    /// HTTP 403 class - penalized since it rarely self-resolves quickly
    #[error("Access Denied: {0}")]
    AccessDenied(String),

    /// Retry ceiling reached for a single operation
    #[error("Exhausted after {attempts} attempts, last error: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// Configuration errors
    #[error("Config Error: {0}")]
    ConfigError(String),

    /// State persistence errors
    #[error("State Store Error: {0}")]
    StoreError(String),
}

impl From<serde_json::Error> for ProspectorError {
    fn from(err: serde_json::Error) -> Self {
        ProspectorError::StoreError(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<anyhow::Error> for ProspectorError {
    fn from(err: anyhow::Error) -> Self {
        ProspectorError::NetworkError(format!("{:#}", err))
    }
}

impl From<solana_client::client_error::ClientError> for ProspectorError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        ProspectorError::NetworkError(format!("Solana client error: {}", err))
    }
}

impl ProspectorError {
    /// Determines if an error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            ProspectorError::NetworkError(_) => true,
            ProspectorError::RateLimited(_) => true,
            ProspectorError::AccessDenied(_) => true,
            ProspectorError::Exhausted { .. } => false, // Terminal for the single operation
            ProspectorError::ConfigError(_) => false,   // Config needs fixing
            ProspectorError::StoreError(_) => true,     // Store might recover
        }
    }
}

/// Shape of a single failed attempt, derived from the HTTP-status/message
/// text of whatever the operation returned. Drives both the outcome reported
/// to the endpoint pool and the retry accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Timeouts, resets, refused connections and everything unclassified
    Transient,
    /// HTTP 429 or a rate-limit phrase
    RateLimited,
    /// HTTP 403
    AccessDenied,
}

/// Classify a failure by its message/status shape.
pub fn classify_failure(message: &str) -> FailureKind {
    let m = message.to_ascii_lowercase();

    if m.contains("429") || m.contains("rate limit") || m.contains("too many requests") {
        FailureKind::RateLimited
    } else if m.contains("403") || m.contains("forbidden") || m.contains("access denied") {
        FailureKind::AccessDenied
    } else {
        FailureKind::Transient
    }
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, ProspectorError>;
