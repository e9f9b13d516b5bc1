use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced to callers of the assessment engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("assessment not found: {0}")]
    NotFound(String),

    #[error("assessment id allocation exhausted after {attempts} attempts in scope {scope}")]
    AllocationExhausted { scope: String, attempts: u32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
