use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the ingestion boundary: bad input files or formats.
///
/// API-side failures have their own taxonomy in
/// [`crate::services::tinfoil::TinfoilError`].
#[derive(Debug, Error)]
pub enum TextRagError {
    #[error("unsupported export format: {format}")]
    UnsupportedFormat { format: String },

    #[error("failed to read export file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TextRagError>;
