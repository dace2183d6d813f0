use std::env;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

use crate::env::logging as env_vars;

/// Logging configuration for textrag
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: Level,
    /// Optional file path for logging instead of stderr
    pub file_path: Option<PathBuf>,
    /// Whether to use ANSI colors
    pub use_colors: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            file_path: None,
            use_colors: true,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level_str) = env::var(env_vars::LOG_LEVEL) {
            config.level = match level_str.to_lowercase().as_str() {
                "error" => Level::ERROR,
                "warn" => Level::WARN,
                "info" => Level::INFO,
                "debug" => Level::DEBUG,
                "trace" => Level::TRACE,
                _ => Level::WARN,
            };
        }

        if let Ok(file_path) = env::var(env_vars::LOG_FILE) {
            config.file_path = Some(PathBuf::from(file_path));
        }

        if env::var(env_vars::NO_COLOR).is_ok() {
            config.use_colors = false;
        }

        config
    }
}

/// Initialize logging with the given configuration.
///
/// Diagnostics go to stderr by default so they do not interleave with the
/// streamed answer on stdout; TEXTRAG_LOG_FILE redirects them to a file.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let registry = Registry::default();

    match &config.file_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_filter(LevelFilter::from_level(config.level));
            registry.with(layer).init();
        }
        None => {
            let layer = fmt::layer()
                .with_ansi(config.use_colors)
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::from_level(config.level));
            registry.with(layer).init();
        }
    }

    tracing::debug!(level = ?config.level, file_path = ?config.file_path, "Logging initialized");

    Ok(())
}

/// Initialize logging from environment variables
pub fn init_from_env() -> Result<()> {
    init_logging(LoggingConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(config.file_path.is_none());
        assert!(config.use_colors);
    }

    #[test]
    fn test_builder() {
        let config = LoggingConfig::new()
            .with_level(Level::DEBUG)
            .with_file("/tmp/textrag.log");
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.file_path, Some(PathBuf::from("/tmp/textrag.log")));
    }
}
