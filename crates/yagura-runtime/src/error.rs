//! Runtime error types.

use thiserror::Error;
use yagura_core::YaguraError;

use crate::config::ConfigError;

/// Errors that can occur while hosting a Yagura application.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The runtime failed to start.
    #[error(transparent)]
    Yagura(#[from] YaguraError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
