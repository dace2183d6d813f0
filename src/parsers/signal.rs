use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::error::{Result, TextRagError};
use crate::models::Message;

#[derive(Debug, Deserialize)]
struct SignalRecord {
    date: String,
    sender: String,
    body: String,
}

/// Parser for Signal exports: one JSON object per line with `date`,
/// `sender`, and `body` fields. Malformed lines are skipped with a warning.
pub struct SignalParser {
    file_path: PathBuf,
}

impl SignalParser {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(&self) -> Result<Vec<Message>> {
        let file = File::open(&self.file_path).map_err(|source| TextRagError::FileRead {
            path: self.file_path.clone(),
            source,
        })?;

        let reader = BufReader::new(file);
        let mut messages = Vec::new();

        for line in reader.lines() {
            let line = line.map_err(|source| TextRagError::FileRead {
                path: self.file_path.clone(),
                source,
            })?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record: SignalRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(error) => {
                    warn!(%error, "Failed to parse line, skipping");
                    continue;
                }
            };

            let Some(timestamp) = parse_iso_timestamp(&record.date) else {
                warn!(date = record.date.as_str(), "Unparseable date, skipping line");
                continue;
            };

            let message = Message::new(timestamp, record.sender, record.body.trim().to_string());
            if message.is_valid() {
                messages.push(message);
            }
        }

        Ok(messages)
    }
}

/// Accepts both offset-carrying ISO-8601 dates and naive ones, which the
/// desktop exporter emits without a timezone; naive dates are taken as UTC.
fn parse_iso_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
