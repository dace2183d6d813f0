use std::path::Path;
use std::sync::Arc;

use anyhow::{ensure, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{chunk_messages, ChunkingConfig};
use crate::parsers::{parse_file, ExportFormat};
use crate::services::EmbeddingProvider;
use crate::vector_store::{EmbeddingRecord, VectorStore};

/// Chunks embedded per API request; mirrors the store write batch.
const EMBED_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReport {
    pub messages_parsed: usize,
    pub chunks_created: usize,
    pub chunks_stored: usize,
}

/// Drives the write path: parse, chunk, embed, store.
pub struct IngestService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IngestService {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Ingest one export file. Chunk ids are deterministic, so running this
    /// again over the same file replaces records instead of duplicating them.
    pub async fn ingest_file(
        &self,
        path: impl AsRef<Path>,
        format: ExportFormat,
        chunking: ChunkingConfig,
    ) -> Result<IngestReport> {
        let path = path.as_ref();

        let messages = parse_file(path, format)?;
        info!(path = %path.display(), count = messages.len(), "Parsed messages");

        let chunks = chunk_messages(&messages, chunking);
        debug!(count = chunks.len(), "Created chunks");

        if chunks.is_empty() {
            return Ok(IngestReport {
                messages_parsed: messages.len(),
                chunks_created: 0,
                chunks_stored: 0,
            });
        }

        let progress = ProgressBar::new(chunks.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks")
        {
            progress.set_style(style.progress_chars("#>-"));
        }

        let mut chunks_stored = 0;
        let total_batches = chunks.len().div_ceil(EMBED_BATCH_SIZE);

        for (batch_index, batch) in chunks.chunks(EMBED_BATCH_SIZE).enumerate() {
            debug!(
                batch = batch_index + 1,
                total_batches,
                size = batch.len(),
                "Embedding batch"
            );

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            ensure!(
                vectors.len() == batch.len(),
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );

            for (chunk, vector) in batch.iter().zip(vectors) {
                self.store.put(EmbeddingRecord::new(
                    chunk.clone(),
                    vector,
                    self.embedder.model_name(),
                ))?;
                progress.inc(1);
            }

            chunks_stored += batch.len();
        }

        progress.finish_and_clear();

        Ok(IngestReport {
            messages_parsed: messages.len(),
            chunks_created: chunks.len(),
            chunks_stored,
        })
    }
}
