//! Layered error definitions
//!
//! Categorized by source: config / region / protocol / perception / transport

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Shared Region Errors =====
    /// Backing region missing or not yet sized by the producer
    #[error("shared region '{path}' unavailable: {message}")]
    RegionUnavailable { path: String, message: String },

    // ===== Protocol Errors =====
    /// Compile-time protocol constant does not match the encoded layout
    #[error("protocol mismatch for {what}: expected {expected}, got {actual}")]
    ProtocolMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Correction packet could not be decoded
    #[error("packet decode error: {message}")]
    PacketDecode { message: String },

    // ===== Perception Errors =====
    /// Required perception asset is missing
    #[error("perception asset missing: {path}")]
    AssetMissing { path: String },

    /// Perception adapter failed on a frame
    #[error("perception error: {message}")]
    Perception { message: String },

    // ===== Transport Errors =====
    /// Sink send error
    #[error("sink '{sink_name}' send error: {message}")]
    SinkSend { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create region unavailable error
    pub fn region_unavailable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegionUnavailable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create packet decode error
    pub fn packet_decode(message: impl Into<String>) -> Self {
        Self::PacketDecode {
            message: message.into(),
        }
    }

    /// Create perception error
    pub fn perception(message: impl Into<String>) -> Self {
        Self::Perception {
            message: message.into(),
        }
    }

    /// Create sink send error
    pub fn sink_send(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkSend {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error must stop startup (as opposed to being retried in the loop)
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::ProtocolMismatch { .. }
                | Self::AssetMissing { .. }
        )
    }
}
