//! CorrectionPacket - outbound wire representation of one control decision
//!
//! Layout (little-endian, 20 bytes):
//! `magic:u32, version:u16, flags:u16, frame_id:u32, dx:f32, dy:f32`

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Packet magic ("AID1")
pub const PACKET_MAGIC: u32 = 0x3144_4941;
/// Packet protocol version
pub const PACKET_VERSION: u16 = 1;
/// Fixed packet length in bytes
pub const PACKET_SIZE: usize = 20;
/// `flags` bit 0: a target is present
pub const FLAG_HAS_TARGET: u16 = 0x0001;

/// Controller output for one iteration
///
/// `dx`/`dy` are already the emitted (integer-valued) displacement; the
/// fractional part stays in the controller's accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Correction {
    pub has_target: bool,
    pub dx: f64,
    pub dy: f64,
}

impl Correction {
    /// No target: zero displacement
    pub const NONE: Correction = Correction {
        has_target: false,
        dx: 0.0,
        dy: 0.0,
    };

    pub fn target(dx: f64, dy: f64) -> Self {
        Self {
            has_target: true,
            dx,
            dy,
        }
    }
}

/// Encoded control decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPacket {
    pub frame_id: u32,
    pub has_target: bool,
    pub dx: f32,
    pub dy: f32,
}

impl CorrectionPacket {
    /// Build a packet, rounding the displacement toward zero
    pub fn new(frame_id: u32, has_target: bool, dx: f64, dy: f64) -> Self {
        Self {
            frame_id,
            has_target,
            dx: dx.trunc() as f32,
            dy: dy.trunc() as f32,
        }
    }

    /// "Stop" packet sent once when the target disappears
    pub fn release(frame_id: u32) -> Self {
        Self::new(frame_id, false, 0.0, 0.0)
    }

    pub fn from_correction(frame_id: u32, correction: &Correction) -> Self {
        Self::new(frame_id, correction.has_target, correction.dx, correction.dy)
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        if self.has_target {
            FLAG_HAS_TARGET
        } else {
            0
        }
    }

    /// Encode into a fresh 20-byte buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_SIZE);
        buf.put_u32_le(PACKET_MAGIC);
        buf.put_u16_le(PACKET_VERSION);
        buf.put_u16_le(self.flags());
        buf.put_u32_le(self.frame_id);
        buf.put_f32_le(self.dx);
        buf.put_f32_le(self.dy);
        buf.freeze()
    }

    /// Decode and validate magic, version and length
    pub fn decode(buf: &[u8]) -> Result<Self, ContractError> {
        if buf.len() != PACKET_SIZE {
            return Err(ContractError::packet_decode(format!(
                "expected {} bytes, got {}",
                PACKET_SIZE,
                buf.len()
            )));
        }

        let mut buf = buf;
        let magic = buf.get_u32_le();
        if magic != PACKET_MAGIC {
            return Err(ContractError::packet_decode(format!(
                "bad magic 0x{magic:08x}"
            )));
        }
        let version = buf.get_u16_le();
        if version != PACKET_VERSION {
            return Err(ContractError::packet_decode(format!(
                "unsupported version {version}"
            )));
        }
        let flags = buf.get_u16_le();

        Ok(Self {
            frame_id: buf.get_u32_le(),
            has_target: flags & FLAG_HAS_TARGET != 0,
            dx: buf.get_f32_le(),
            dy: buf.get_f32_le(),
        })
    }
}
