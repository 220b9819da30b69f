// kubeintent-core/src/providers/scripted.rs

//! Test-only provider that replays canned responses in order.

use super::Provider;
use crate::models::chat::{ApiResponse, ChatMessage, Choice};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub(crate) struct ScriptedProvider {
    responses: Arc<Mutex<VecDeque<Result<String, String>>>>,
    received: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedProvider {
    /// `Ok` entries become assistant messages, `Err` entries become backend failures.
    pub(crate) fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every message list the provider was called with, in call order.
    pub(crate) fn received(&self) -> Vec<Vec<ChatMessage>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_completion(&self, messages: Vec<ChatMessage>) -> Result<ApiResponse> {
        self.received.lock().unwrap().push(messages);
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()));
        match next {
            Ok(content) => Ok(ApiResponse {
                id: "scripted".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: ChatMessage {
                        role: "assistant".to_string(),
                        content: Some(content),
                    },
                    finish_reason: Some("stop".to_string()),
                }],
            }),
            Err(e) => Err(anyhow!(e)),
        }
    }
}
