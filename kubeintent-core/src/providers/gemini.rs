// kubeintent-core/src/providers/gemini.rs
use super::Provider;
use crate::api;
use crate::config::ModelConfig;
use crate::models::chat::{ApiResponse, ChatMessage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, trace};

/// Gemini through its OpenAI-compatible chat-completions surface.
#[derive(Clone)]
pub struct GeminiProvider {
    config: ModelConfig,
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiProvider {
    /// Fails when the model config has no endpoint; there is no default.
    pub fn new(config: ModelConfig, http_client: Client, api_key: String) -> Result<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            anyhow!(
                "Endpoint missing for Gemini provider model {}",
                config.model_name
            )
        })?;
        Ok(Self {
            config,
            http_client,
            api_key,
            endpoint,
        })
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    async fn get_completion(&self, messages: Vec<ChatMessage>) -> Result<ApiResponse> {
        trace!(endpoint = %self.endpoint, "Calling Gemini chat completion");
        let result = api::call_chat_completion_api(
            &self.http_client,
            &self.endpoint,
            &self.api_key,
            &self.config.model_name,
            messages,
            self.config.parameters.as_ref(),
            self.config.max_retries(),
        )
        .await;

        if let Err(e) = &result {
            error!(error = %e, "Gemini completion failed");
        }
        result
    }
}
