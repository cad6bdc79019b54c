//! Configuration errors raised while declaring or freezing a machine.

use thiserror::Error;

/// Errors that can occur when configuring a state machine.
///
/// These are programmer errors. They abort the offending configuration call,
/// or the validation pass that runs when the machine locks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Configuration is locked once the machine has been fired")]
    Locked,

    #[error("Trigger '{trigger}' is already configured for state '{state}'")]
    DuplicateTrigger { state: String, trigger: String },

    #[error("Trigger '{trigger}' would re-enter '{state}'. Use an internal transition")]
    ReentrantTransition { state: String, trigger: String },

    #[error("State '{state}' is a substate of '{parent}', which is not configured")]
    UnknownParent { state: String, parent: String },

    #[error("State '{state}' is its own ancestor")]
    CyclicHierarchy { state: String },

    #[error("Trigger '{trigger}' on '{state}' targets unconfigured state '{destination}'")]
    UnknownDestination {
        state: String,
        trigger: String,
        destination: String,
    },

    #[error("Initial substate '{initial}' of '{state}' is not a configured descendant of it")]
    InvalidInitial { state: String, initial: String },

    #[error("Initial substate chain starting at '{state}' exceeds {max} hops")]
    InitialChainTooDeep { state: String, max: usize },

    #[error("{} configuration errors: {}", .0.len(), join(.0))]
    Multiple(Vec<ConfigError>),
}

impl ConfigError {
    /// Flatten into the individual violations.
    pub fn violations(&self) -> Vec<&ConfigError> {
        match self {
            ConfigError::Multiple(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
