pub mod ingest;
pub mod query;
pub mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::runtime::Runtime;

use crate::env::apis;
use crate::models::ChunkingConfig;
use crate::parsers::ExportFormat;
use crate::services::{
    ChatProvider, EmbeddingProvider, QueryService, TinfoilChatProvider, TinfoilEmbeddingProvider,
    DEFAULT_TOP_K, EMBEDDING_DIM,
};
use crate::vector_store::{SqliteVectorStore, VectorStore};

#[derive(Parser)]
#[command(name = "textrag")]
#[command(about = "Retrieval-augmented question answering over exported chat logs")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Path to an exported chat log to ingest
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Format of the input file
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Directory holding the vector database
    #[arg(long)]
    pub db: PathBuf,

    /// Print the retrieved excerpts after each answer
    #[arg(long)]
    pub excerpts: bool,

    /// Serve an OpenAI-compatible endpoint on this port instead of the
    /// interactive prompt (0 disables)
    #[arg(long, default_value_t = 0)]
    pub listen: u16,

    /// Messages per chunk (1 embeds each message on its own)
    #[arg(long, default_value_t = 1)]
    pub chunk_size: usize,

    /// Messages repeated between adjacent chunks in window mode
    #[arg(long, default_value_t = 0)]
    pub overlap: usize,

    /// Number of excerpts retrieved per question
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(self.execute())
    }

    async fn execute(self) -> Result<()> {
        let api_key = std::env::var(apis::TINFOIL_API_KEY).unwrap_or_default();

        if let Some(file) = self.file.clone() {
            let Some(format) = self.format else {
                bail!("--format is required when --file is given");
            };
            if self.chunk_size > 1 && self.overlap >= self.chunk_size {
                bail!("--overlap must be smaller than --chunk-size");
            }

            let chunking = ChunkingConfig::new(self.chunk_size, self.overlap);
            ingest::handle_ingest(&file, format, &self.db, chunking, &api_key).await
        } else if self.listen > 0 {
            serve::handle_serve(self.listen, &self.db, self.top_k, &api_key).await
        } else {
            query::handle_interactive(&self.db, self.top_k, self.excerpts, &api_key).await
        }
    }
}

/// Wire the read path against the on-disk store and the hosted providers.
pub(crate) fn build_query_service(db: &Path, top_k: usize, api_key: &str) -> Result<QueryService> {
    let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::open(db, EMBEDDING_DIM)?);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TinfoilEmbeddingProvider::new(api_key)?);
    let chat: Arc<dyn ChatProvider> = Arc::new(TinfoilChatProvider::new(api_key)?);

    Ok(QueryService::new(store, embedder, chat).with_top_k(top_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingest_invocation() {
        let cli = Cli::parse_from([
            "textrag",
            "--file",
            "export.txt",
            "--format",
            "imessage",
            "--db",
            "/tmp/db",
        ]);

        assert_eq!(cli.file, Some(PathBuf::from("export.txt")));
        assert_eq!(cli.format, Some(ExportFormat::Imessage));
        assert_eq!(cli.db, PathBuf::from("/tmp/db"));
        assert_eq!(cli.listen, 0);
        assert_eq!(cli.chunk_size, 1);
    }

    #[test]
    fn test_txt_alias_for_imessage() {
        let cli = Cli::parse_from(["textrag", "--format", "txt", "--db", "/tmp/db"]);
        assert_eq!(cli.format, Some(ExportFormat::Imessage));
    }

    #[test]
    fn test_db_flag_is_required() {
        let result = Cli::try_parse_from(["textrag"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_query_invocation_defaults() {
        let cli = Cli::parse_from(["textrag", "--db", "/tmp/db", "--excerpts"]);
        assert!(cli.file.is_none());
        assert!(cli.excerpts);
        assert_eq!(cli.top_k, DEFAULT_TOP_K);
    }
}
