//! Persistence for (chunk, vector, text) records with similarity search.

pub mod models;
pub mod sqlite;

use anyhow::Result;

pub use models::{EmbeddingRecord, SearchResult};
pub use sqlite::SqliteVectorStore;

/// Storage abstraction for embedded chunks.
///
/// The orchestration layer only depends on this trait, so the backing index
/// can be swapped without touching ingestion or query logic. Single-writer
/// usage is assumed.
pub trait VectorStore: Send + Sync {
    /// Insert a record, replacing any existing record with the same id.
    fn put(&self, record: EmbeddingRecord) -> Result<()>;

    /// The `k` stored records nearest to `query`, closest first.
    fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored records.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
