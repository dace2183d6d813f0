//! Environment variable constants used throughout the application
//!
//! This module centralizes all environment variable names so configuration
//! stays consistent across the codebase.

/// Logging configuration
pub mod logging {
    /// Log level configuration (e.g., "debug", "info", "warn", "error")
    pub const LOG_LEVEL: &str = "TEXTRAG_LOG_LEVEL";

    /// Log file path for file-based logging
    pub const LOG_FILE: &str = "TEXTRAG_LOG_FILE";

    /// Disable colored output (follows the NO_COLOR standard)
    pub const NO_COLOR: &str = "NO_COLOR";
}

/// External API configuration
pub mod apis {
    /// API key for the Tinfoil inference enclaves. The literal value "none"
    /// switches the embedding and chat clients to a local OpenAI-compatible
    /// server instead of the hosted enclaves.
    pub const TINFOIL_API_KEY: &str = "TINFOIL_API_KEY";

    /// Sentinel key value selecting offline mode.
    pub const OFFLINE_KEY: &str = "none";
}
