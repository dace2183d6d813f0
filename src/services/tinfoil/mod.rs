//! Client for the Tinfoil confidential-inference enclaves.
//!
//! The enclaves speak the OpenAI wire protocol, so the same client also
//! works against any local OpenAI-compatible server (offline mode).

pub mod client;
pub mod errors;
pub mod models;
pub mod retry;

pub use client::{TinfoilClient, TinfoilConfig, CHAT_MODEL, EMBEDDING_MODEL};
pub use errors::{RetryError, TinfoilError};
pub use models::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, StreamChunk};
pub use retry::{with_retry, RetryConfig};
