pub mod imessage;
pub mod signal;

use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;

use crate::error::{Result, TextRagError};
use crate::models::Message;

pub use imessage::ImessageParser;
pub use signal::SignalParser;

/// Supported export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Plain-text iMessage export (blocks separated by blank lines)
    #[value(alias = "txt")]
    Imessage,
    /// Signal export, one JSON object per line
    Signal,
}

impl FromStr for ExportFormat {
    type Err = TextRagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "imessage" | "txt" => Ok(ExportFormat::Imessage),
            "signal" => Ok(ExportFormat::Signal),
            other => Err(TextRagError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Imessage => write!(f, "imessage"),
            ExportFormat::Signal => write!(f, "signal"),
        }
    }
}

/// Parse an export file into messages using the parser for `format`.
pub fn parse_file(path: impl AsRef<Path>, format: ExportFormat) -> Result<Vec<Message>> {
    match format {
        ExportFormat::Imessage => ImessageParser::new(path).parse(),
        ExportFormat::Signal => SignalParser::new(path).parse(),
    }
}
