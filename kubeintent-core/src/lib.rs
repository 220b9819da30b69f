// kubeintent-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod analysis;
pub mod api;
pub mod audit;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod fallback;
pub mod handlers;
pub mod history;
pub mod knowledge;
pub mod orchestrator;
pub mod providers;
pub mod router;
pub mod safety;
pub mod tools;
pub mod utils;

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers::{generic, network, operator, HandlerContext};
use crate::models::execution::OrchestrationResult;

pub use analysis::{Analysis, Severity};
pub use audit::AuditLog;
pub use config::AssistantConfig;
pub use errors::AssistantError;
pub use history::{InteractionLog, MemoryInteractionLog};
pub use knowledge::KnowledgeBase;
pub use models::execution::{BatchStatus, ExecutionOutcome};
pub use models::response::{AssistantReply, AssistantResponse};
pub use orchestrator::Orchestrator;
pub use providers::{Provider, ProviderRegistry};
pub use router::{classify, ClassificationDecision};
pub use tools::ProcessRunner;

pub use async_trait::async_trait;

/// Routes a request to its handler, assesses the result and logs the
/// interaction.
pub struct Assistant {
    providers: ProviderRegistry,
    orchestrator: Orchestrator,
    knowledge: KnowledgeBase,
    interaction_log: Arc<dyn InteractionLog>,
    system_prompt: Option<String>,
}

impl Assistant {
    pub fn new(
        providers: ProviderRegistry,
        orchestrator: Orchestrator,
        knowledge: KnowledgeBase,
        interaction_log: Arc<dyn InteractionLog>,
    ) -> Self {
        Self {
            providers,
            orchestrator,
            knowledge,
            interaction_log,
            system_prompt: None,
        }
    }

    /// Wires providers, runner and orchestrator from a validated config.
    pub fn from_config(
        config: &AssistantConfig,
        knowledge: KnowledgeBase,
        interaction_log: Arc<dyn InteractionLog>,
        audit: Arc<AuditLog>,
    ) -> Result<Self, AssistantError> {
        let providers = ProviderRegistry::from_config(config)
            .map_err(|e| AssistantError::config(format!("{:#}", e)))?;
        let runner = ProcessRunner::new(config.execution.resolved_extra_paths());
        let orchestrator = Orchestrator::new(runner, config.execution.timeout(), audit);
        Ok(Self::new(providers, orchestrator, knowledge, interaction_log)
            .with_system_prompt(config.system_prompt.clone()))
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Handles one natural-language request.
    ///
    /// Command failures, safety rejections and generation failures are all
    /// reported inside the reply. Only a missing default provider is an error.
    pub async fn handle(&self, query: &str) -> Result<AssistantReply, AssistantError> {
        let query = query.trim();
        let provider = self
            .providers
            .default()
            .map_err(|e| AssistantError::config(e.to_string()))?;

        let id = match self.interaction_log.record_query(query) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %AssistantError::Persistence(e), "Failed to record query");
                Uuid::new_v4()
            }
        };

        let response = if query.is_empty() {
            AssistantResponse::Commands(OrchestrationResult::empty(
                query,
                "Empty request; nothing to do.",
            ))
        } else {
            let decision = classify(query);
            info!(decision = ?decision, provider = %provider.name(), "Handling request");
            match decision {
                ClassificationDecision::OperatorCheck { operator: name } => {
                    AssistantResponse::Operator(
                        operator::check_operator(&self.orchestrator, query, &name).await,
                    )
                }
                ClassificationDecision::NetworkWorkflow => AssistantResponse::Network(
                    network::run_network_workflow(&self.orchestrator, query).await,
                ),
                ClassificationDecision::GenericCommand => {
                    let ctx = HandlerContext {
                        provider,
                        knowledge: &self.knowledge,
                        orchestrator: &self.orchestrator,
                        system_prompt: self.system_prompt.as_deref(),
                    };
                    generic::handle_generic(&ctx, query).await
                }
            }
        };

        let reply = AssistantReply {
            id,
            analysis: analysis::assess(&response),
            response,
        };
        if let Err(e) = self.interaction_log.record_result(id, &reply) {
            warn!(id = %id, error = %AssistantError::Persistence(e), "Failed to record result");
        }
        Ok(reply)
    }
}

// --- Modules ---
pub mod models {
    pub mod chat;
    pub mod execution;
    pub mod response;
}
