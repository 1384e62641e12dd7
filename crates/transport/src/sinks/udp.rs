//! UdpSink - 通过 UDP 发送修正包
//!
//! 每个修正量一个 20 字节数据报，尽力而为：失败不重试，由调用方节流记录。

use std::net::SocketAddr;
use std::time::Duration;

use contracts::{ContractError, CorrectionPacket, CorrectionSink};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use crate::error::TransportError;

/// 单次发送的超时上限
pub const SEND_TIMEOUT: Duration = Duration::from_millis(50);

/// UDP Sink
#[derive(Debug)]
pub struct UdpSink {
    name: String,
    target: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpSink {
    /// 解析 `host:port` 并建立已连接的 socket
    #[instrument(name = "udp_sink_connect", skip(name))]
    pub async fn connect(name: impl Into<String>, endpoint: &str) -> Result<Self, TransportError> {
        let target = tokio::net::lookup_host(endpoint)
            .await
            .map_err(|e| TransportError::invalid_endpoint(endpoint, e.to_string()))?
            .next()
            .ok_or_else(|| TransportError::invalid_endpoint(endpoint, "no address resolved"))?;

        Self::connect_addr(name, target).await
    }

    /// 直接使用已解析的地址
    pub async fn connect_addr(
        name: impl Into<String>,
        target: SocketAddr,
    ) -> Result<Self, TransportError> {
        let bind_addr = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;

        let name = name.into();
        debug!(sink = %name, target = %target, "UDP socket connected");

        Ok(Self {
            name,
            target,
            socket: Some(socket),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    async fn transmit(&self, data: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or_else(|| TransportError::Closed {
            sink_name: self.name.clone(),
        })?;

        match tokio::time::timeout(SEND_TIMEOUT, socket.send(data)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(TransportError::Timeout {
                sink_name: self.name.clone(),
            }),
        }
    }
}

impl CorrectionSink for UdpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_sink_send",
        skip(self, packet),
        fields(sink = %self.name, frame_id = packet.frame_id)
    )]
    async fn send(&mut self, packet: &CorrectionPacket) -> Result<(), ContractError> {
        let data = packet.encode();
        self.transmit(&data).await.map_err(|e| match e {
            TransportError::Io(io) => ContractError::sink_send(&self.name, io.to_string()),
            other => other.into(),
        })
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if self.socket.take().is_some() {
            debug!(sink = %self.name, "UdpSink closed");
        }
        Ok(())
    }
}
