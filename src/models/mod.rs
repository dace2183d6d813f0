pub mod chunk;
pub mod message;

pub use chunk::{chunk_messages, Chunk, ChunkMetadata, ChunkingConfig};
pub use message::Message;
