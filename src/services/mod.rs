pub mod chat;
pub mod embedding;
pub mod ingest_service;
pub mod query_service;
pub mod tinfoil;

pub use chat::{ChatProvider, TinfoilChatProvider};
pub use embedding::{EmbeddingProvider, TinfoilEmbeddingProvider, EMBEDDING_DIM};
pub use ingest_service::{IngestReport, IngestService};
pub use query_service::{build_messages, Answer, QueryService, DEFAULT_TOP_K, NO_CONTEXT_ANSWER};
