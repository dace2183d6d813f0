//! End-to-end write-path tests: parse → chunk → embed → store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use textrag::models::ChunkingConfig;
use textrag::parsers::ExportFormat;
use textrag::services::{EmbeddingProvider, IngestService};
use textrag::vector_store::{SqliteVectorStore, VectorStore};

const DIMS: usize = 8;

/// Deterministic stand-in for the hosted embedding API: a seeded LCG keyed
/// by the text hash, normalized to unit length. Identical text always maps
/// to an identical vector, which is what the round-trip properties need.
struct HashEmbedder;

fn hash_embedding(text: &str) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let mut state = hasher.finish();

    let mut vector = Vec::with_capacity(DIMS);
    for _ in 0..DIMS {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let value = (state >> 32) as u32;
        vector.push((value as f32 / u32::MAX as f32) * 2.0 - 1.0);
    }

    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in &mut vector {
            *value /= magnitude;
        }
    }

    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(hash_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_embedding(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn signal_export(count: usize) -> String {
    (0..count)
        .map(|i| {
            format!(
                r#"{{"date":"2024-03-01T17:{:02}:00","sender":"{}","body":"message {i}"}}"#,
                i,
                if i % 2 == 0 { "Alice" } else { "Bob" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

const IMESSAGE_EXPORT: &str = "\
Mar 01, 2024 5:00:00 PM
Alice
Meet at 5pm

Mar 01, 2024 5:01:30 PM (Read by them after 2 minutes)
Bob
See you then
";

#[tokio::test]
async fn test_imessage_one_chunk_per_message() {
    let dir = TempDir::new().unwrap();
    let export = write_file(&dir, "export.txt", IMESSAGE_EXPORT);

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    let service = IngestService::new(store.clone(), Arc::new(HashEmbedder));

    let report = service
        .ingest_file(&export, ExportFormat::Imessage, ChunkingConfig::default())
        .await
        .unwrap();

    assert_eq!(report.messages_parsed, 2);
    assert_eq!(report.chunks_created, 2);
    assert_eq!(report.chunks_stored, 2);
    assert_eq!(store.len().unwrap(), 2);
}

#[tokio::test]
async fn test_signal_one_chunk_per_message() {
    let dir = TempDir::new().unwrap();
    let export = write_file(&dir, "export.jsonl", &signal_export(5));

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    let service = IngestService::new(store.clone(), Arc::new(HashEmbedder));

    let report = service
        .ingest_file(&export, ExportFormat::Signal, ChunkingConfig::default())
        .await
        .unwrap();

    assert_eq!(report.messages_parsed, 5);
    assert_eq!(report.chunks_created, 5);
    assert_eq!(store.len().unwrap(), 5);
}

#[tokio::test]
async fn test_stored_chunk_is_its_own_top1() {
    let dir = TempDir::new().unwrap();
    let export = write_file(&dir, "export.txt", IMESSAGE_EXPORT);

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    let service = IngestService::new(store.clone(), Arc::new(HashEmbedder));
    service
        .ingest_file(&export, ExportFormat::Imessage, ChunkingConfig::default())
        .await
        .unwrap();

    // Querying with the embedding of a stored chunk's own text must return
    // that chunk first (distance zero under cosine).
    let text = "[2024-03-01 17:00:00] Alice: Meet at 5pm";
    let results = store.nearest(&hash_embedding(text), 2).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].text, text);
    assert!(results[0].distance < 1e-5);
}

#[tokio::test]
async fn test_reingest_same_file_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let export = write_file(&dir, "export.jsonl", &signal_export(4));

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    let service = IngestService::new(store.clone(), Arc::new(HashEmbedder));

    for _ in 0..2 {
        service
            .ingest_file(&export, ExportFormat::Signal, ChunkingConfig::default())
            .await
            .unwrap();
    }

    assert_eq!(store.len().unwrap(), 4);

    // A fixed query at fixed k sees no duplicate chunks.
    let results = store.nearest(&hash_embedding("message 0"), 4).unwrap();
    let mut ids: Vec<_> = results.iter().map(|r| r.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_empty_export_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let export = write_file(&dir, "empty.txt", "");

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    let service = IngestService::new(store.clone(), Arc::new(HashEmbedder));

    let report = service
        .ingest_file(&export, ExportFormat::Imessage, ChunkingConfig::default())
        .await
        .unwrap();

    assert_eq!(report.messages_parsed, 0);
    assert_eq!(report.chunks_created, 0);
    assert!(store.is_empty().unwrap());
    assert!(store
        .nearest(&hash_embedding("anything"), 5)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_window_mode_groups_messages() {
    let dir = TempDir::new().unwrap();
    let export = write_file(&dir, "export.jsonl", &signal_export(12));

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    let service = IngestService::new(store.clone(), Arc::new(HashEmbedder));

    let report = service
        .ingest_file(&export, ExportFormat::Signal, ChunkingConfig::new(10, 2))
        .await
        .unwrap();

    // Windows start at messages 0 and 8: one full window of ten and a tail
    // of four.
    assert_eq!(report.chunks_created, 2);
    assert_eq!(store.len().unwrap(), 2);

    let results = store.nearest(&hash_embedding("anything"), 5).unwrap();
    assert!(results.iter().any(|r| r.message_count == 10));
    assert!(results.iter().any(|r| r.message_count == 4));
}
