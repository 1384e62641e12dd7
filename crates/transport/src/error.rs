//! Transport error types

use contracts::ContractError;
use thiserror::Error;

/// Transport-specific errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Endpoint could not be parsed or resolved
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Send did not complete within the deadline
    #[error("send to '{sink_name}' timed out")]
    Timeout { sink_name: String },

    /// Sink already closed
    #[error("sink '{sink_name}' is closed")]
    Closed { sink_name: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn invalid_endpoint(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

impl From<TransportError> for ContractError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidEndpoint { ref endpoint, .. } => ContractError::SinkConnection {
                sink_name: endpoint.clone(),
                message: err.to_string(),
            },
            TransportError::Timeout { ref sink_name }
            | TransportError::Closed { ref sink_name } => {
                ContractError::sink_send(sink_name.clone(), err.to_string())
            }
            TransportError::Io(e) => ContractError::Io(e),
        }
    }
}
