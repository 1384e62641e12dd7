//! CorrectionSink trait - Transport output interface
//!
//! Defines the abstract interface for correction sinks.

use crate::{ContractError, CorrectionPacket};

/// Correction output trait
///
/// All sink implementations must implement this trait. Sends are
/// best-effort: an implementation must return promptly and never retry.
#[trait_variant::make(CorrectionSink: Send)]
pub trait LocalCorrectionSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Send one packet
    ///
    /// # Errors
    /// Returns send error (should include context)
    async fn send(&mut self, packet: &CorrectionPacket) -> Result<(), ContractError>;

    /// Close sink, releasing its handle
    async fn close(&mut self) -> Result<(), ContractError>;
}
