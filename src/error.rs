//! Engine error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A programming-contract violation: showing a visible actor, registering with a stopped loop.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Art (or another asset) could not be loaded while assembling a level.
    #[error("resource unavailable: {name} ({reason})")]
    ResourceUnavailable { name: String, reason: String },
}

impl EngineError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
