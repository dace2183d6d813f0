use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::tinfoil::{ChatMessage, TinfoilClient, TinfoilConfig, TinfoilError};

/// Provider-agnostic chat completion interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run a completion to the end and return the full answer.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Stream a completion; the receiver yields answer fragments.
    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String, TinfoilError>>>;

    fn model_name(&self) -> &str;
}

/// Completions from the Tinfoil chat enclave (or its local stand-in).
pub struct TinfoilChatProvider {
    client: TinfoilClient,
}

impl TinfoilChatProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = TinfoilClient::new(TinfoilConfig::chat(api_key))?;
        Ok(Self { client })
    }

    pub fn with_client(client: TinfoilClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatProvider for TinfoilChatProvider {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        Ok(self.client.chat_completion(messages).await?)
    }

    async fn stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String, TinfoilError>>> {
        Ok(self.client.stream_chat_completion(messages).await?)
    }

    fn model_name(&self) -> &str {
        &self.client.config().model
    }
}
