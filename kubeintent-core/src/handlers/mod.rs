// kubeintent-core/src/handlers/mod.rs

//! The specialized handlers behind each [`crate::router::ClassificationDecision`].
//!
//! Operator and network handlers work from fixed command sets and never call
//! the text generator. The generic handler does.

use crate::knowledge::KnowledgeBase;
use crate::orchestrator::Orchestrator;
use crate::providers::Provider;

pub mod generic;
pub mod network;
pub mod operator;

/// Borrowed collaborators for one request.
pub struct HandlerContext<'a> {
    pub provider: &'a dyn Provider,
    pub knowledge: &'a KnowledgeBase,
    pub orchestrator: &'a Orchestrator,
    pub system_prompt: Option<&'a str>,
}
