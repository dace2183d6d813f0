use serde::{Deserialize, Serialize};

use super::Message;

/// How messages are grouped before embedding.
///
/// The default is one chunk per message. Window mode (`chunk_size` > 1)
/// groups consecutive messages with `overlap` messages repeated between
/// adjacent windows to keep conversational context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1,
            overlap: 0,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    /// Step between window starts; always at least one.
    fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.overlap).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub start_time: i64,
    pub end_time: i64,
    pub message_count: usize,
    pub senders: String,
}

/// A unit of text sent to the embedding API and persisted in the store.
///
/// The id is a deterministic function of the window position and time range,
/// so re-ingesting the same file overwrites rather than duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Group parsed messages into chunks according to `config`.
///
/// In window mode, windows with fewer than two messages are dropped; a
/// single trailing message carries too little context to embed on its own.
pub fn chunk_messages(messages: &[Message], config: ChunkingConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let step = config.step();

    let mut index = 0;
    while index < messages.len() {
        let window = &messages[index..(index + config.chunk_size).min(messages.len())];

        if config.chunk_size > 1 && window.len() < 2 {
            break;
        }

        let text = window
            .iter()
            .map(Message::formatted)
            .collect::<Vec<_>>()
            .join("\n");

        let start_time = window[0].timestamp.timestamp();
        let end_time = window[window.len() - 1].timestamp.timestamp();

        let mut senders: Vec<&str> = window.iter().map(|m| m.sender.as_str()).collect();
        senders.sort_unstable();
        senders.dedup();

        chunks.push(Chunk {
            id: format!("chunk_{index}_{start_time}_{end_time}"),
            text,
            metadata: ChunkMetadata {
                start_time,
                end_time,
                message_count: window.len(),
                senders: senders.join(","),
            },
        });

        index += step;
    }

    chunks
}
