//! Storage engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] stratus_core::ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] stratus_storage::StorageError),
}
