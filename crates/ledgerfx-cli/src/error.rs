use ledgerfx_core::EngineError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Engine(EngineError::Validation(_)) => 2,
            Self::Engine(EngineError::Cache(_)) => 5,
            Self::Engine(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
