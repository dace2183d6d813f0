use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat message from an export file.
///
/// Immutable once parsed; the ingestion pipeline groups messages into
/// [`crate::models::Chunk`]s before embedding them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub content: String,
}

impl Message {
    pub fn new(timestamp: DateTime<Utc>, sender: String, content: String) -> Self {
        Self {
            timestamp,
            sender,
            content,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.content.is_empty()
    }

    /// Render the message the way it is embedded and shown in excerpts.
    pub fn formatted(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.sender,
            self.content
        )
    }
}
