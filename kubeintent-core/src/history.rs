// kubeintent-core/src/history.rs

//! The interaction log: an audit trail of queries and replies.
//!
//! It is written to but never read back into routing or execution.

use anyhow::Result;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::response::AssistantReply;

pub trait InteractionLog: Send + Sync {
    /// Records a new query and returns the key its result will be stored under.
    fn record_query(&self, query: &str) -> Result<Uuid>;
    fn record_result(&self, id: Uuid, reply: &AssistantReply) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub query: String,
    pub reply: Option<AssistantReply>,
}

/// In-memory log for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryInteractionLog {
    entries: Mutex<Vec<MemoryEntry>>,
}

impl MemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn get(&self, id: Uuid) -> Option<MemoryEntry> {
        self.entries().into_iter().find(|e| e.id == id)
    }
}

impl InteractionLog for MemoryInteractionLog {
    fn record_query(&self, query: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("interaction log lock poisoned"))?;
        entries.push(MemoryEntry {
            id,
            query: query.to_string(),
            reply: None,
        });
        Ok(id)
    }

    fn record_result(&self, id: Uuid, reply: &AssistantReply) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("interaction log lock poisoned"))?;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| anyhow::anyhow!("no interaction recorded with id {}", id))?;
        entry.reply = Some(reply.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::assess;
    use crate::models::execution::OrchestrationResult;
    use crate::models::response::AssistantResponse;

    #[test]
    fn test_query_then_result() {
        let log = MemoryInteractionLog::new();
        let id = log.record_query("list pods").unwrap();
        assert!(log.get(id).unwrap().reply.is_none());

        let response = AssistantResponse::Commands(OrchestrationResult::empty("list pods", "none"));
        let reply = AssistantReply {
            id,
            analysis: assess(&response),
            response,
        };
        log.record_result(id, &reply).unwrap();
        assert_eq!(log.get(id).unwrap().reply, Some(reply));
    }

    #[test]
    fn test_unknown_id_is_an_error() {
        let log = MemoryInteractionLog::new();
        let response = AssistantResponse::Commands(OrchestrationResult::empty("q", "none"));
        let reply = AssistantReply {
            id: Uuid::new_v4(),
            analysis: assess(&response),
            response,
        };
        assert!(log.record_result(reply.id, &reply).is_err());
    }
}
