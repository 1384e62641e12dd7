//! Shared-memory frame header and materialized frame
//!
//! Header layout (little-endian, 48 bytes):
//!
//! ```text
//! off  size field
//!   0     4 magic          0x56414353 ("SCAV")
//!   4     2 version        1
//!   6     2 header_size    48
//!   8     4 sequence       odd = write in progress
//!  12     4 frame_id
//!  16     4 roi_x
//!  20     4 roi_y
//!  24     2 width
//!  26     2 height
//!  28     2 stride         bytes per row, >= width * 3
//!  30     2 pixel_format   1 = BGR24
//!  32     8 timestamp_us
//!  40     4 payload_size   == stride * height
//!  44     4 reserved
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Header magic ("SCAV")
pub const HEADER_MAGIC: u32 = 0x5641_4353;
/// Header protocol version
pub const HEADER_VERSION: u16 = 1;
/// Fixed header length in bytes
pub const HEADER_SIZE: usize = 48;
/// Byte offset of the sequence counter inside the header
pub const SEQUENCE_OFFSET: usize = 8;
/// The single supported pixel format
pub const PIXEL_FORMAT_BGR24: u16 = 1;
/// Bytes per BGR24 pixel
pub const BYTES_PER_PIXEL: usize = 3;
/// Default edge length of the published region of interest
pub const DEFAULT_MAX_ROI: u16 = 256;

/// Maximum payload for a square ROI of `max_roi` pixels
pub const fn max_payload_for_roi(max_roi: u16) -> usize {
    max_roi as usize * max_roi as usize * BYTES_PER_PIXEL
}

/// Total mapping size (header + max payload)
pub const fn mapping_size_for_roi(max_roi: u16) -> usize {
    HEADER_SIZE + max_payload_for_roi(max_roi)
}

/// Decoded shared-memory header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u32,
    pub version: u16,
    pub header_size: u16,
    pub sequence: u32,
    pub frame_id: u32,
    pub roi_x: u32,
    pub roi_y: u32,
    pub width: u16,
    pub height: u16,
    pub stride: u16,
    pub pixel_format: u16,
    pub timestamp_us: u64,
    pub payload_size: u32,
    pub reserved: u32,
}

/// Reason a header was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFault {
    BadMagic,
    BadVersion,
    BadHeaderSize,
    BadPixelFormat,
    DimensionsTooSmall,
    StrideTooSmall,
    PayloadMismatch,
    PayloadOutOfRange,
}

impl HeaderFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadMagic => "bad_magic",
            Self::BadVersion => "bad_version",
            Self::BadHeaderSize => "bad_header_size",
            Self::BadPixelFormat => "bad_pixel_format",
            Self::DimensionsTooSmall => "dimensions_too_small",
            Self::StrideTooSmall => "stride_too_small",
            Self::PayloadMismatch => "payload_mismatch",
            Self::PayloadOutOfRange => "payload_out_of_range",
        }
    }
}

impl FrameHeader {
    /// Build a well-formed header for a tightly or loosely packed BGR24 frame
    pub fn new(frame_id: u32, width: u16, height: u16, stride: u16, timestamp_us: u64) -> Self {
        Self {
            magic: HEADER_MAGIC,
            version: HEADER_VERSION,
            header_size: HEADER_SIZE as u16,
            sequence: 0,
            frame_id,
            roi_x: 0,
            roi_y: 0,
            width,
            height,
            stride,
            pixel_format: PIXEL_FORMAT_BGR24,
            timestamp_us,
            payload_size: stride as u32 * height as u32,
            reserved: 0,
        }
    }

    /// Decode from the first [`HEADER_SIZE`] bytes of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self, ContractError> {
        if buf.len() < HEADER_SIZE {
            return Err(ContractError::ProtocolMismatch {
                what: "frame header",
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let mut buf = &buf[..HEADER_SIZE];
        Ok(Self {
            magic: buf.get_u32_le(),
            version: buf.get_u16_le(),
            header_size: buf.get_u16_le(),
            sequence: buf.get_u32_le(),
            frame_id: buf.get_u32_le(),
            roi_x: buf.get_u32_le(),
            roi_y: buf.get_u32_le(),
            width: buf.get_u16_le(),
            height: buf.get_u16_le(),
            stride: buf.get_u16_le(),
            pixel_format: buf.get_u16_le(),
            timestamp_us: buf.get_u64_le(),
            payload_size: buf.get_u32_le(),
            reserved: buf.get_u32_le(),
        })
    }

    /// Encode into a fresh 48-byte buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_u32_le(self.magic);
        buf.put_u16_le(self.version);
        buf.put_u16_le(self.header_size);
        buf.put_u32_le(self.sequence);
        buf.put_u32_le(self.frame_id);
        buf.put_u32_le(self.roi_x);
        buf.put_u32_le(self.roi_y);
        buf.put_u16_le(self.width);
        buf.put_u16_le(self.height);
        buf.put_u16_le(self.stride);
        buf.put_u16_le(self.pixel_format);
        buf.put_u64_le(self.timestamp_us);
        buf.put_u32_le(self.payload_size);
        buf.put_u32_le(self.reserved);
        buf.freeze()
    }

    /// Active bytes per row (without row padding)
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Check protocol identity and geometry against `max_payload`
    pub fn check(&self, max_payload: usize) -> Result<(), HeaderFault> {
        if self.magic != HEADER_MAGIC {
            return Err(HeaderFault::BadMagic);
        }
        if self.version != HEADER_VERSION {
            return Err(HeaderFault::BadVersion);
        }
        if self.header_size as usize != HEADER_SIZE {
            return Err(HeaderFault::BadHeaderSize);
        }
        if self.pixel_format != PIXEL_FORMAT_BGR24 {
            return Err(HeaderFault::BadPixelFormat);
        }
        if self.width < 2 || self.height < 2 {
            return Err(HeaderFault::DimensionsTooSmall);
        }
        if (self.stride as usize) < self.row_bytes() {
            return Err(HeaderFault::StrideTooSmall);
        }
        if self.payload_size as usize != self.stride as usize * self.height as usize {
            return Err(HeaderFault::PayloadMismatch);
        }
        if self.payload_size == 0 || self.payload_size as usize > max_payload {
            return Err(HeaderFault::PayloadOutOfRange);
        }
        Ok(())
    }
}

/// A validated, contiguous BGR24 frame
///
/// Rows are packed (`width * 3` bytes each); any producer row padding has
/// been stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Producer frame counter (wraps)
    pub frame_id: u32,

    /// Active width in pixels
    pub width: u32,

    /// Active height in pixels
    pub height: u32,

    /// Producer timestamp (microseconds)
    pub timestamp_us: u64,

    /// ROI origin within the producer's full image
    pub roi_x: u32,
    pub roi_y: u32,

    /// Packed BGR24 pixels
    pub data: Bytes,
}

impl Frame {
    /// Materialize a frame from a strided payload, keeping only the active sub-rectangle
    pub fn from_strided(header: &FrameHeader, payload: &[u8]) -> Result<Self, ContractError> {
        let row_bytes = header.row_bytes();
        let stride = header.stride as usize;
        let height = header.height as usize;

        let needed = stride * height;
        if payload.len() < needed {
            return Err(ContractError::ProtocolMismatch {
                what: "frame payload",
                expected: needed,
                actual: payload.len(),
            });
        }

        let data = if stride == row_bytes {
            Bytes::copy_from_slice(&payload[..needed])
        } else {
            let mut packed = BytesMut::with_capacity(row_bytes * height);
            for row in payload[..needed].chunks_exact(stride) {
                packed.extend_from_slice(&row[..row_bytes]);
            }
            packed.freeze()
        };

        Ok(Self {
            frame_id: header.frame_id,
            width: header.width as u32,
            height: header.height as u32,
            timestamp_us: header.timestamp_us,
            roi_x: header.roi_x,
            roi_y: header.roi_y,
            data,
        })
    }

    /// BGR value at (x, y); `None` outside the frame
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Crop a centered square of edge `size` (clamped to the frame)
    ///
    /// The crop's ROI origin is expressed in the same coordinate space as
    /// this frame's origin.
    pub fn crop_center(&self, size: u32) -> Frame {
        let w = size.min(self.width);
        let h = size.min(self.height);
        let x0 = (self.width - w) / 2;
        let y0 = (self.height - h) / 2;

        let src_row = self.width as usize * BYTES_PER_PIXEL;
        let dst_row = w as usize * BYTES_PER_PIXEL;
        let mut data = BytesMut::with_capacity(dst_row * h as usize);
        for y in y0..y0 + h {
            let start = y as usize * src_row + x0 as usize * BYTES_PER_PIXEL;
            data.extend_from_slice(&self.data[start..start + dst_row]);
        }

        Frame {
            frame_id: self.frame_id,
            width: w,
            height: h,
            timestamp_us: self.timestamp_us,
            roi_x: self.roi_x + x0,
            roi_y: self.roi_y + y0,
            data: data.freeze(),
        }
    }
}
