// kubeintent-core/src/config.rs

//! Handles configuration structures and parsing for the assistant library.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::tools::default_extra_paths;

/// File name searched for by the CLI.
pub const CONFIG_FILENAME: &str = "KubeIntent.toml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const KNOWN_PROVIDER_TYPES: &[&str] = &["openai", "gemini", "ollama"];

#[derive(Deserialize, Debug, Clone)]
pub struct AssistantConfig {
    /// Replaces the built-in command-generation instructions when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub default_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderInstanceConfig>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProviderInstanceConfig {
    // Use `type` in TOML, map to `provider_type`
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub api_key_env_var: String,
    pub model_config: ModelConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ModelConfig {
    pub model_name: String,
    #[serde(default)]
    pub parameters: Option<toml::Value>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl ModelConfig {
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ExecutionConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra binary directories appended to PATH. `None` uses the built-in list.
    #[serde(default)]
    pub extra_paths: Option<Vec<PathBuf>>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            extra_paths: None,
        }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn resolved_extra_paths(&self) -> Vec<PathBuf> {
        self.extra_paths.clone().unwrap_or_else(default_extra_paths)
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct KnowledgeConfig {
    /// Markdown or plain-text notes injected into generation prompts.
    /// Relative paths are resolved against the config file's directory.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl AssistantConfig {
    pub fn from_toml_str(config_toml_content: &str) -> Result<AssistantConfig> {
        let config: AssistantConfig = match toml::from_str(config_toml_content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };

        // --- Basic Checks ---
        if config.default_provider.trim().is_empty() {
            return Err(anyhow!("'default_provider' key in config content is empty."));
        }
        if !config.providers.contains_key(&config.default_provider) {
            return Err(anyhow!(
                "Default provider '{}' not found in [providers] map.",
                config.default_provider
            ));
        }
        if let Some(prompt) = &config.system_prompt {
            if prompt.trim().is_empty() {
                return Err(anyhow!("'system_prompt' is set but empty."));
            }
        }

        // --- Provider Validation ---
        for (key, provider) in &config.providers {
            if provider.provider_type.trim().is_empty() {
                return Err(anyhow!("Provider '{}' is missing 'type'.", key));
            }
            if !KNOWN_PROVIDER_TYPES.contains(&provider.provider_type.as_str()) {
                return Err(anyhow!(
                    "Provider '{}' has unknown type '{}'. Expected one of: {}.",
                    key,
                    provider.provider_type,
                    KNOWN_PROVIDER_TYPES.join(", ")
                ));
            }
            if provider.model_config.model_name.trim().is_empty() {
                return Err(anyhow!(
                    "Provider '{}' is missing 'model_config.model_name'.",
                    key
                ));
            }
            if provider.api_key_env_var.trim().is_empty() && provider.provider_type != "ollama" {
                return Err(anyhow!("Provider '{}' is missing 'api_key_env_var'.", key));
            }
            match &provider.model_config.endpoint {
                Some(endpoint) => {
                    if endpoint.trim().is_empty() {
                        return Err(anyhow!(
                            "Provider '{}' has an empty 'model_config.endpoint'.",
                            key
                        ));
                    }
                    Url::parse(endpoint).with_context(|| {
                        format!(
                            "Invalid URL format for endpoint ('{}') in provider '{}'.",
                            endpoint, key
                        )
                    })?;
                }
                None if provider.provider_type == "gemini" => {
                    return Err(anyhow!(
                        "Provider '{}' of type 'gemini' requires 'model_config.endpoint'.",
                        key
                    ));
                }
                None => {}
            }
            if let Some(params) = &provider.model_config.parameters {
                if !params.is_table() {
                    return Err(anyhow!(
                        "Provider '{}' has invalid 'model_config.parameters'. Expected a TOML table.",
                        key
                    ));
                }
            }
        }

        // --- Execution Validation ---
        if config.execution.timeout_secs == 0 {
            return Err(anyhow!("'execution.timeout_secs' must be greater than zero."));
        }

        tracing::info!("Successfully parsed and validated assistant configuration.");
        Ok(config)
    }

    /// Reads and validates `path`, resolving a relative knowledge file against
    /// the config file's directory.
    pub fn load_from_file(path: &Path) -> Result<AssistantConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {:?}", path))?;
        if let (Some(file), Some(dir)) = (config.knowledge.file.as_mut(), path.parent()) {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
        Ok(config)
    }
}
