use thiserror::Error;

#[derive(Debug, Error)]
pub enum TinfoilError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {source}")]
    NetworkError { source: reqwest::Error },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl TinfoilError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TinfoilError::RateLimitExceeded { .. } => true,
            TinfoilError::Timeout { .. } => true,
            TinfoilError::NetworkError { .. } => true,
            TinfoilError::ServerError { status, .. } => *status >= 500,
            TinfoilError::ServiceUnavailable { .. } => true,
            _ => false,
        }
    }

    pub fn is_authentication_error(&self) -> bool {
        matches!(self, TinfoilError::AuthenticationFailed { .. })
    }

    /// Server-suggested wait before retrying, when the error class implies one.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            TinfoilError::RateLimitExceeded { .. } => Some(30),
            TinfoilError::Timeout { .. } => Some(5),
            TinfoilError::ServerError { .. } => Some(10),
            TinfoilError::ServiceUnavailable { .. } => Some(60),
            _ => None,
        }
    }

    pub fn from_reqwest_error(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            // The reqwest error does not carry the configured timeout.
            TinfoilError::Timeout { timeout_ms: 30_000 }
        } else if error.is_connect() {
            TinfoilError::NetworkError { source: error }
        } else if let Some(status) = error.status() {
            Self::from_status_and_body(status, &error.to_string())
        } else {
            TinfoilError::NetworkError { source: error }
        }
    }

    pub fn from_status_and_body(status: reqwest::StatusCode, body: &str) -> Self {
        let status_code = status.as_u16();

        // OpenAI-compatible servers wrap details in {"error": {"message": ...}}
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string());

        match status_code {
            400 => TinfoilError::InvalidRequest { message },
            401 | 403 => TinfoilError::AuthenticationFailed { message },
            429 => TinfoilError::RateLimitExceeded { message },
            503 => TinfoilError::ServiceUnavailable { message },
            500..=599 => TinfoilError::ServerError {
                status: status_code,
                message,
            },
            _ => TinfoilError::InvalidRequest {
                message: format!("HTTP {status_code}: {message}"),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("Maximum retry attempts exceeded")]
    MaxAttemptsExceeded,

    #[error("Retry timeout exceeded")]
    TimeoutExceeded,

    #[error("Non-retryable error: {source}")]
    NonRetryable { source: TinfoilError },
}
