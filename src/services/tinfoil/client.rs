use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use super::errors::{RetryError, TinfoilError};
use super::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, EmbeddingRequest,
    EmbeddingResponse, StreamChunk,
};
use super::retry::{with_retry, RetryConfig};
use crate::env::apis;

/// Enclave hostname serving chat completions.
pub const CHAT_ENCLAVE: &str = "llama3-3-70b.model.tinfoil.sh";
pub const CHAT_MODEL: &str = "llama3-3-70b";

/// Enclave hostname serving embeddings.
pub const EMBEDDING_ENCLAVE: &str = "nomic-embed-text.model.tinfoil.sh";
pub const EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Base URL used when TINFOIL_API_KEY is the offline sentinel: a local
/// OpenAI-compatible server (e.g. ollama) instead of the hosted enclaves.
const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Clone)]
pub struct TinfoilConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl TinfoilConfig {
    /// Configuration for the chat completion enclave.
    pub fn chat(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            base_url: Self::base_url_for(CHAT_ENCLAVE, &api_key),
            model: CHAT_MODEL.to_string(),
            api_key,
            timeout: Duration::from_secs(300),
            max_retries: 3,
        }
    }

    /// Configuration for the embedding enclave.
    pub fn embeddings(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            base_url: Self::base_url_for(EMBEDDING_ENCLAVE, &api_key),
            model: EMBEDDING_MODEL.to_string(),
            api_key,
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }

    fn base_url_for(enclave: &str, api_key: &str) -> String {
        if api_key == apis::OFFLINE_KEY {
            LOCAL_BASE_URL.to_string()
        } else {
            format!("https://{enclave}/v1")
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.api_key == apis::OFFLINE_KEY
    }

    pub fn validate(&self) -> Result<(), TinfoilError> {
        if self.api_key.is_empty() {
            return Err(TinfoilError::ConfigurationError {
                message: format!(
                    "{} is required (use \"{}\" for a local server)",
                    apis::TINFOIL_API_KEY,
                    apis::OFFLINE_KEY
                ),
            });
        }

        if self.base_url.is_empty() {
            return Err(TinfoilError::ConfigurationError {
                message: "Base URL cannot be empty".to_string(),
            });
        }

        if self.model.is_empty() {
            return Err(TinfoilError::ConfigurationError {
                message: "Model name cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP client for one Tinfoil enclave (or a local stand-in).
#[derive(Clone)]
pub struct TinfoilClient {
    config: TinfoilConfig,
    client: Client,
}

impl TinfoilClient {
    pub fn new(config: TinfoilConfig) -> Result<Self, TinfoilError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TinfoilError::ConfigurationError {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &TinfoilConfig {
        &self.config
    }

    fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.config.max_retries).with_total_timeout(self.config.timeout)
    }

    fn map_retry_error(&self, error: RetryError) -> TinfoilError {
        match error {
            RetryError::NonRetryable { source } => source,
            RetryError::MaxAttemptsExceeded => TinfoilError::RateLimitExceeded {
                message: "Maximum retry attempts exceeded".to_string(),
            },
            RetryError::TimeoutExceeded => TinfoilError::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            },
        }
    }

    /// Embed a batch of texts; one vector per input, in input order.
    pub async fn create_embeddings(&self, input: &[String]) -> Result<Vec<Vec<f32>>, TinfoilError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let response = with_retry(self.retry_config(), || self.create_embeddings_once(input))
            .await
            .map_err(|e| self.map_retry_error(e))?;

        let vectors = response.into_vectors();
        if vectors.len() != input.len() {
            return Err(TinfoilError::InvalidResponse {
                message: format!(
                    "expected {} embeddings, got {}",
                    input.len(),
                    vectors.len()
                ),
            });
        }

        Ok(vectors)
    }

    async fn create_embeddings_once(
        &self,
        input: &[String],
    ) -> Result<EmbeddingResponse, TinfoilError> {
        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: input.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(TinfoilError::from_reqwest_error)?;

        self.handle_response(response).await
    }

    /// Run a chat completion to completion and return the full answer text.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, TinfoilError> {
        let response: ChatCompletionResponse =
            with_retry(self.retry_config(), || self.chat_completion_once(&messages))
                .await
                .map_err(|e| self.map_retry_error(e))?;

        response
            .extract_text()
            .ok_or_else(|| TinfoilError::InvalidResponse {
                message: "No text content in response".to_string(),
            })
    }

    async fn chat_completion_once(
        &self,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletionResponse, TinfoilError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(TinfoilError::from_reqwest_error)?;

        self.handle_response(response).await
    }

    /// Stream a chat completion; the receiver yields answer fragments as the
    /// server produces them.
    pub async fn stream_chat_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<mpsc::Receiver<Result<String, TinfoilError>>, TinfoilError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            stream: true,
        };

        // Only the initial request is retried; once the stream is open,
        // failures surface through the channel.
        let response = with_retry(self.retry_config(), || self.open_stream(&request))
            .await
            .map_err(|e| self.map_retry_error(e))?;

        let (tx, rx) = mpsc::channel(32);
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer = String::new();

            while let Some(item) = stream.next().await {
                let bytes = match item {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        let _ = tx.send(Err(TinfoilError::from_reqwest_error(error))).await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // SSE events are newline-delimited; a chunk may end mid-line,
                // so only complete lines are consumed here.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    if line.is_empty() {
                        continue;
                    }
                    if line == "data: [DONE]" {
                        return;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            if let Some(content) = chunk.delta_content() {
                                if tx.send(Ok(content.to_string())).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(error) => {
                            tracing::debug!(%error, "Skipping unparseable stream chunk");
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn open_stream(&self, request: &ChatCompletionRequest) -> Result<Response, TinfoilError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(TinfoilError::from_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(TinfoilError::from_status_and_body(status, &body));
        }

        Ok(response)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, TinfoilError> {
        let status = response.status();

        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(TinfoilError::from_reqwest_error)?;

            serde_json::from_str(&text).map_err(|e| TinfoilError::ParseError {
                message: format!("Failed to parse response: {e}"),
            })
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            Err(TinfoilError::from_status_and_body(status, &body))
        }
    }
}
