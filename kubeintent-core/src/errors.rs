// kubeintent-core/src/errors.rs
use thiserror::Error;

/// Errors that can surface from the assistant core.
///
/// Command failures are not errors here: they are reported as data inside
/// [`crate::models::execution::ExecutionOutcome`]. These variants cover the
/// collaborators around the command path.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Error related to configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error during interaction with the text-generation backend.
    #[error("API Error: {0}")]
    Api(#[source] anyhow::Error),

    /// The backend answered, but the answer was unusable.
    #[error("Generation Error: {0}")]
    Generation(String),

    /// Error writing to the interaction log.
    #[error("Persistence Error: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl AssistantError {
    pub fn config(msg: impl Into<String>) -> Self {
        AssistantError::Config(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        AssistantError::Generation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        assert_eq!(
            AssistantError::config("missing provider").to_string(),
            "Configuration Error: missing provider"
        );
        let api = AssistantError::Api(anyhow::anyhow!("status 500"));
        assert_eq!(api.to_string(), "API Error: status 500");
        assert!(std::error::Error::source(&api).is_some());
    }
}
