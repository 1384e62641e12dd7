//! LogSink - 记录修正包到日志 (调试用)

use contracts::{ContractError, CorrectionPacket, CorrectionSink};
use tracing::{debug, info, instrument};

/// 日志 Sink
#[derive(Debug)]
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    /// 已记录的包数量
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl CorrectionSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_send",
        skip(self, packet),
        fields(sink = %self.name, frame_id = packet.frame_id)
    )]
    async fn send(&mut self, packet: &CorrectionPacket) -> Result<(), ContractError> {
        self.count += 1;
        info!(
            has_target = packet.has_target,
            dx = packet.dx,
            dy = packet.dy,
            "correction"
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, packets = self.count, "LogSink closed");
        Ok(())
    }
}
