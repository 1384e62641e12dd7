//! Correction sinks

mod log;
mod udp;

pub use log::LogSink;
pub use udp::UdpSink;

use contracts::{
    ContractError, CorrectionPacket, CorrectionSink, TransportConfig, TransportKind,
};

use crate::error::TransportError;

/// Sink selected by `transport.kind`
///
/// `CorrectionSink` has async methods and is not object-safe, so the
/// configured choice is carried as an enum instead of a trait object.
#[derive(Debug)]
pub enum ConfiguredSink {
    Udp(UdpSink),
    Log(LogSink),
}

impl ConfiguredSink {
    /// Build the sink named by the config
    pub async fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        match config.kind {
            TransportKind::Udp => Ok(Self::Udp(
                UdpSink::connect("udp", &config.endpoint()).await?,
            )),
            TransportKind::Log => Ok(Self::Log(LogSink::new("log"))),
        }
    }
}

impl CorrectionSink for ConfiguredSink {
    fn name(&self) -> &str {
        match self {
            Self::Udp(sink) => sink.name(),
            Self::Log(sink) => sink.name(),
        }
    }

    async fn send(&mut self, packet: &CorrectionPacket) -> Result<(), ContractError> {
        match self {
            Self::Udp(sink) => sink.send(packet).await,
            Self::Log(sink) => sink.send(packet).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Udp(sink) => sink.close().await,
            Self::Log(sink) => sink.close().await,
        }
    }
}
