// kubeintent-core/src/providers/mod.rs
use crate::config::AssistantConfig;
use crate::errors::AssistantError;
use crate::models::chat::{ApiResponse, ChatMessage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A text-generation backend.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn get_completion(&self, messages: Vec<ChatMessage>) -> Result<ApiResponse>;
    fn name(&self) -> &str;
}

pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn Provider>>,
    default_provider: String,
}

impl ProviderRegistry {
    pub fn new(default_provider: String) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider,
        }
    }

    /// Builds one provider per `[providers.*]` entry, reading API keys from
    /// the configured environment variables.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .context("Failed to build HTTP client for providers")?;

        let mut registry = ProviderRegistry::new(config.default_provider.clone());
        for (id, provider_conf) in &config.providers {
            let api_key = if !provider_conf.api_key_env_var.is_empty() {
                match std::env::var(&provider_conf.api_key_env_var) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!(
                            provider_id = %id,
                            env_var = %provider_conf.api_key_env_var,
                            error = %e,
                            "API key environment variable not set or invalid"
                        );
                        String::new()
                    }
                }
            } else {
                String::new()
            };
            let model_config = provider_conf.model_config.clone();
            let provider: Box<dyn Provider> = match provider_conf.provider_type.as_str() {
                "openai" => Box::new(openai::OpenAIProvider::new(
                    model_config,
                    http_client.clone(),
                    api_key,
                )),
                "gemini" => Box::new(gemini::GeminiProvider::new(
                    model_config,
                    http_client.clone(),
                    api_key,
                )?),
                "ollama" => Box::new(ollama::OllamaProvider::new(
                    model_config,
                    http_client.clone(),
                    api_key,
                )),
                other => return Err(anyhow!("Unsupported provider type: {}", other)),
            };
            registry.register(id.clone(), provider);
        }
        Ok(registry)
    }

    pub fn register(&mut self, id: String, provider: Box<dyn Provider>) {
        debug!(provider_id = %id, model = %provider.name(), "Registered provider");
        self.providers.insert(id, provider);
    }

    pub fn get(&self, id: &str) -> Result<&dyn Provider> {
        self.providers
            .get(id)
            .map(|p| p.as_ref())
            .ok_or_else(|| anyhow!("Provider not found: {}", id))
    }

    pub fn default(&self) -> Result<&dyn Provider> {
        self.get(&self.default_provider)
    }

    pub fn default_provider_id(&self) -> &str {
        &self.default_provider
    }
}

/// One system + user exchange, returning the first choice's text.
pub async fn generate_text(
    provider: &dyn Provider,
    system: &str,
    user: &str,
) -> Result<String, AssistantError> {
    let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
    let response = provider
        .get_completion(messages)
        .await
        .map_err(AssistantError::Api)?;
    response
        .first_content()
        .map(str::to_string)
        .ok_or_else(|| {
            AssistantError::generation(format!("{} returned no content", provider.name()))
        })
}

pub mod gemini;
pub mod ollama;
pub mod openai;

#[cfg(test)]
pub(crate) mod scripted;
