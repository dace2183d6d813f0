use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::{style, Emoji};

use crate::models::ChunkingConfig;
use crate::parsers::ExportFormat;
use crate::services::{IngestService, TinfoilEmbeddingProvider, EMBEDDING_DIM};
use crate::vector_store::SqliteVectorStore;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");

pub async fn handle_ingest(
    file: &Path,
    format: ExportFormat,
    db: &Path,
    chunking: ChunkingConfig,
    api_key: &str,
) -> Result<()> {
    let store = Arc::new(SqliteVectorStore::open(db, EMBEDDING_DIM)?);
    let embedder = Arc::new(TinfoilEmbeddingProvider::new(api_key)?);
    let service = IngestService::new(store, embedder);

    let report = service.ingest_file(file, format, chunking).await?;

    println!("Parsed {} messages", report.messages_parsed);
    println!("Created {} chunks", report.chunks_created);
    println!(
        "{}{}",
        CHECK,
        style(format!(
            "Stored {} chunks in {}",
            report.chunks_stored,
            db.display()
        ))
        .green()
    );

    Ok(())
}
