use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Chunk, ChunkMetadata};

/// A chunk together with its embedding, as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub model_name: String,
    pub embedded_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    pub fn new(chunk: Chunk, vector: Vec<f32>, model_name: impl Into<String>) -> Self {
        Self {
            id: chunk.id,
            vector,
            text: chunk.text,
            metadata: chunk.metadata,
            model_name: model_name.into(),
            embedded_at: Utc::now(),
        }
    }
}

/// One nearest-neighbor hit, closest-first ordering by `distance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub start_time: i64,
    pub end_time: i64,
    pub message_count: usize,
    pub senders: String,
    pub distance: f32,
}
