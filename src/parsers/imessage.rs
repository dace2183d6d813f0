use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::error::{Result, TextRagError};
use crate::models::Message;

lazy_static! {
    // The first line of a block is a timestamp, optionally followed by a
    // read receipt such as "(Read by them after 2 minutes)".
    static ref TIMESTAMP_LINE: Regex = Regex::new(r"^(.*?)(\(Read.*\))?$").unwrap();
    static ref BLOCK_SEPARATOR: Regex = Regex::new(r"\n\n+").unwrap();
}

const TIMESTAMP_FORMAT: &str = "%b %d, %Y %I:%M:%S %p";

/// Parser for plain-text iMessage exports.
///
/// Each message is a block separated by blank lines: a timestamp line, a
/// sender line, then the message body. Blocks that cannot be parsed are
/// skipped with a warning rather than failing the whole file.
pub struct ImessageParser {
    file_path: PathBuf,
}

impl ImessageParser {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(&self) -> Result<Vec<Message>> {
        let content =
            std::fs::read_to_string(&self.file_path).map_err(|source| TextRagError::FileRead {
                path: self.file_path.clone(),
                source,
            })?;

        Ok(Self::parse_content(&content))
    }

    fn parse_content(content: &str) -> Vec<Message> {
        let mut messages = Vec::new();

        for block in BLOCK_SEPARATOR.split(content) {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            let lines: Vec<&str> = block.lines().collect();
            if lines.len() < 2 {
                continue;
            }

            let Some(timestamp) = Self::parse_timestamp(lines[0]) else {
                warn!(line = lines[0], "Skipping block with unparseable timestamp");
                continue;
            };

            let sender = lines[1].trim().to_string();
            let content = lines[2..].join("\n").trim().to_string();

            let message = Message::new(timestamp, sender, content);
            if message.is_valid() {
                messages.push(message);
            }
        }

        messages
    }

    fn parse_timestamp(line: &str) -> Option<chrono::DateTime<Utc>> {
        let captures = TIMESTAMP_LINE.captures(line)?;
        let raw = captures.get(1)?.as_str().trim();

        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
Mar 01, 2024 5:00:00 PM
Alice
Meet at 5pm

Mar 01, 2024 5:01:30 PM (Read by them after 2 minutes)
Bob
See you then
";

    fn write_export(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("messages.txt");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_two_messages() {
        let (_dir, path) = write_export(SAMPLE);
        let messages = ImessageParser::new(&path).parse().unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, "Alice");
        assert_eq!(messages[0].content, "Meet at 5pm");
        assert_eq!(messages[1].sender, "Bob");
        assert_eq!(messages[1].content, "See you then");
        assert!(messages[0].timestamp < messages[1].timestamp);
    }

    #[test]
    fn test_read_receipt_is_stripped_from_timestamp() {
        let (_dir, path) = write_export(SAMPLE);
        let messages = ImessageParser::new(&path).parse().unwrap();

        assert_eq!(messages[1].timestamp.format("%H:%M:%S").to_string(), "17:01:30");
    }

    #[test]
    fn test_multiline_body() {
        let export = "Mar 01, 2024 5:00:00 PM\nAlice\nfirst line\nsecond line\n";
        let (_dir, path) = write_export(export);
        let messages = ImessageParser::new(&path).parse().unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "first line\nsecond line");
    }

    #[test]
    fn test_empty_file_yields_no_messages() {
        let (_dir, path) = write_export("");
        let messages = ImessageParser::new(&path).parse().unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_bad_timestamp_block_is_skipped() {
        let export = "not a timestamp\nAlice\nhello\n\nMar 01, 2024 5:00:00 PM\nBob\nhi\n";
        let (_dir, path) = write_export(export);
        let messages = ImessageParser::new(&path).parse().unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, "Bob");
    }

    #[test]
    fn test_missing_file() {
        let err = ImessageParser::new("/no/such/file.txt").parse().unwrap_err();
        assert!(matches!(err, TextRagError::FileRead { .. }));
    }
}
