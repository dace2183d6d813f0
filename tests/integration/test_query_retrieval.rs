//! Read-path tests: retrieval relevance and the answer flow, with stub
//! providers standing in for the hosted APIs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use textrag::models::ChunkingConfig;
use textrag::parsers::ExportFormat;
use textrag::services::tinfoil::{ChatMessage, TinfoilError};
use textrag::services::{
    Answer, ChatProvider, EmbeddingProvider, IngestService, QueryService, NO_CONTEXT_ANSWER,
};
use textrag::vector_store::{SqliteVectorStore, VectorStore};

const DIMS: usize = 4;

/// Maps texts onto fixed directions so relevance is under test control:
/// anything mentioning a meeting time points one way, goodbyes another, and
/// the question "What time?" lands close to the former.
struct KeywordEmbedder;

fn keyword_embedding(text: &str) -> Vec<f32> {
    if text.contains("Meet at 5pm") {
        vec![1.0, 0.0, 0.0, 0.0]
    } else if text.contains("See you then") {
        vec![0.0, 1.0, 0.0, 0.0]
    } else if text.contains("What time") {
        vec![0.9, 0.1, 0.0, 0.0]
    } else {
        vec![0.0, 0.0, 1.0, 0.0]
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_embedding(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_embedding(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword-embedder"
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Chat stub that streams canned fragments and records whether it was used.
struct StubChat {
    called: Arc<AtomicBool>,
}

impl StubChat {
    fn new() -> (Self, Arc<AtomicBool>) {
        let called = Arc::new(AtomicBool::new(false));
        (
            Self {
                called: called.clone(),
            },
            called,
        )
    }
}

#[async_trait]
impl ChatProvider for StubChat {
    async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String> {
        self.called.store(true, Ordering::SeqCst);
        Ok("They meet at 5pm.".to_string())
    }

    async fn stream(
        &self,
        _messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String, TinfoilError>>> {
        self.called.store(true, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(4);
        tx.try_send(Ok("They meet ".to_string())).unwrap();
        tx.try_send(Ok("at 5pm.".to_string())).unwrap();
        Ok(rx)
    }

    fn model_name(&self) -> &str {
        "stub-chat"
    }
}

const SIGNAL_EXPORT: &str = concat!(
    r#"{"date":"2024-03-01T17:00:00","sender":"Alice","body":"Meet at 5pm"}"#,
    "\n",
    r#"{"date":"2024-03-01T17:01:30","sender":"Bob","body":"See you then"}"#,
    "\n",
);

async fn ingested_store(dir: &TempDir) -> Arc<SqliteVectorStore> {
    let export = dir.path().join("export.jsonl");
    std::fs::write(&export, SIGNAL_EXPORT).unwrap();

    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());
    IngestService::new(store.clone(), Arc::new(KeywordEmbedder))
        .ingest_file(&export, ExportFormat::Signal, ChunkingConfig::default())
        .await
        .unwrap();

    store
}

#[tokio::test]
async fn test_what_time_retrieves_the_meeting_chunk() {
    let dir = TempDir::new().unwrap();
    let store = ingested_store(&dir).await;

    let (chat, _called) = StubChat::new();
    let service = QueryService::new(store, Arc::new(KeywordEmbedder), Arc::new(chat));

    let results = service.retrieve("What time?").await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].text.contains("Meet at 5pm"));
    assert!(results[0].distance < results[1].distance);
}

#[tokio::test]
async fn test_answer_streams_fragments() {
    let dir = TempDir::new().unwrap();
    let store = ingested_store(&dir).await;

    let (chat, called) = StubChat::new();
    let service = QueryService::new(store, Arc::new(KeywordEmbedder), Arc::new(chat));

    match service.answer("What time?").await.unwrap() {
        Answer::Streaming {
            mut stream,
            excerpts,
        } => {
            assert!(!excerpts.is_empty());

            let mut answer = String::new();
            while let Some(fragment) = stream.recv().await {
                answer.push_str(&fragment.unwrap());
            }
            assert_eq!(answer, "They meet at 5pm.");
        }
        Answer::NoContext => panic!("expected a streaming answer"),
    }

    assert!(called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_empty_store_answers_without_inference() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteVectorStore::open(dir.path().join("db"), DIMS).unwrap());

    let (chat, called) = StubChat::new();
    let service = QueryService::new(store, Arc::new(KeywordEmbedder), Arc::new(chat));

    assert!(matches!(
        service.answer("What time?").await.unwrap(),
        Answer::NoContext
    ));

    let (answer, excerpts) = service.answer_complete("What time?").await.unwrap();
    assert_eq!(answer, NO_CONTEXT_ANSWER);
    assert!(excerpts.is_empty());
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_top_k_bounds_retrieval() {
    let dir = TempDir::new().unwrap();
    let store = ingested_store(&dir).await;

    let (chat, _called) = StubChat::new();
    let service =
        QueryService::new(store, Arc::new(KeywordEmbedder), Arc::new(chat)).with_top_k(1);

    let results = service.retrieve("What time?").await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].text.contains("Meet at 5pm"));
}
