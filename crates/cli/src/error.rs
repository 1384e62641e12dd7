//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Command-line value could not be applied
    #[error("Invalid argument {name}: {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// Startup check failed; the loop never started
    #[error("Startup failed: {0}")]
    Startup(#[from] ContractError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }
}

/// How a command finished (when it did not fail)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to completion or hit a configured limit
    Completed,
    /// Stopped by the operator (Ctrl+C / SIGTERM)
    Interrupted,
}

impl Outcome {
    /// Process exit code: 0 on completion, 130 on interrupt
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Interrupted => 130,
        }
    }
}

/// Exit code for any fatal error
pub const EXIT_FAILURE: u8 = 1;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
