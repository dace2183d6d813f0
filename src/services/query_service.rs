use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::services::tinfoil::{ChatMessage, TinfoilError};
use crate::services::{ChatProvider, EmbeddingProvider};
use crate::vector_store::{SearchResult, VectorStore};

/// Excerpts retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Returned without calling the inference API when the store has nothing
/// relevant to offer.
pub const NO_CONTEXT_ANSWER: &str =
    "I don't have any stored messages to draw on yet. Ingest an export file first, then ask again.";

const SYSTEM_PROMPT: &str = "You are a helpful assistant analyzing text messages.";

/// The outcome of answering one question.
pub enum Answer {
    /// Nothing in the store matched; no API call was made.
    NoContext,
    /// A streaming answer plus the excerpts it is grounded on.
    Streaming {
        stream: mpsc::Receiver<Result<String, TinfoilError>>,
        excerpts: Vec<SearchResult>,
    },
}

/// Drives the read path: embed the question, retrieve nearest chunks,
/// compose a prompt, stream the completion.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    top_k: usize,
}

impl QueryService {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Embed the question and return the nearest stored chunks.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(question).await?;
        let results = self.store.nearest(&vector, self.top_k)?;
        debug!(question, hits = results.len(), "Retrieved excerpts");
        Ok(results)
    }

    /// Answer a question with a streamed completion over retrieved context.
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        let excerpts = self.retrieve(question).await?;

        if excerpts.is_empty() {
            return Ok(Answer::NoContext);
        }

        let stream = self
            .chat
            .stream(build_messages(&excerpts, question))
            .await?;

        Ok(Answer::Streaming { stream, excerpts })
    }

    /// Non-streaming variant used by the serve mode when a client asks for a
    /// complete response.
    pub async fn answer_complete(&self, question: &str) -> Result<(String, Vec<SearchResult>)> {
        let excerpts = self.retrieve(question).await?;

        if excerpts.is_empty() {
            return Ok((NO_CONTEXT_ANSWER.to_string(), excerpts));
        }

        let text = self
            .chat
            .complete(build_messages(&excerpts, question))
            .await?;

        Ok((text, excerpts))
    }
}

/// Compose the chat request: retrieved excerpts joined by blank lines, then
/// the question and answering instructions.
pub fn build_messages(excerpts: &[SearchResult], question: &str) -> Vec<ChatMessage> {
    let context = excerpts
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = format!(
        "\
You are analyzing text messages from the user.
Based on the following excerpts, please answer this question: {question}

EXCERPTS:
{context}

Please provide a concise answer based only on the information in these excerpts.
Think critically and give the user a rough, unfiltered, and brutally honest answer to the question. Be concise.
Do not include anything about sex, drugs, crime, or anything that is not related to the question. Do not include any names of people.
"
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)]
}
