// kubeintent-core/src/providers/ollama.rs
use super::Provider;
use crate::api;
use crate::config::ModelConfig;
use crate::models::chat::{ApiResponse, ChatMessage};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";

/// A local Ollama server. The API key is optional and usually empty.
#[derive(Clone)]
pub struct OllamaProvider {
    config: ModelConfig,
    http_client: Client,
    api_key: String,
}

impl OllamaProvider {
    pub fn new(config: ModelConfig, http_client: Client, api_key: String) -> Self {
        debug!("Creating new Ollama provider with model: {}", config.model_name);
        Self {
            config,
            http_client,
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_ENDPOINT)
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    async fn get_completion(&self, messages: Vec<ChatMessage>) -> Result<ApiResponse> {
        debug!(endpoint = %self.endpoint(), "Using Ollama endpoint");
        api::call_chat_completion_api(
            &self.http_client,
            self.endpoint(),
            &self.api_key,
            &self.config.model_name,
            messages,
            self.config.parameters.as_ref(),
            self.config.max_retries(),
        )
        .await
    }
}
