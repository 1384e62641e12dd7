//! Producer side of the frame channel
//!
//! 写端协议: sequence+1 (奇数) → release fence → 写头部与载荷 → sequence+1 (偶数, release)。
//! The sequence word is only ever touched atomically; the rest of the
//! header is written around it.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, AtomicU32, Ordering};

use contracts::{
    max_payload_for_roi, FrameHeader, HEADER_SIZE, SEQUENCE_OFFSET,
};
use memmap2::MmapMut;
use tracing::{debug, instrument};

use crate::error::{FrameChannelError, Result};

/// Writes frames into a file-backed region using the seqlock protocol
pub struct FrameWriter {
    path: PathBuf,
    map: MmapMut,
    max_payload: usize,
    sequence: u32,
}

impl FrameWriter {
    /// Create (or truncate) the region sized for `max_roi`
    #[instrument(name = "frame_writer_create", skip(path), fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>, max_roi: u16) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let max_payload = max_payload_for_roi(max_roi);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len((HEADER_SIZE + max_payload) as u64)?;

        // SAFETY: this process is the only writer; readers only observe the
        // region through the sequence protocol.
        let map = unsafe { MmapMut::map_mut(&file)? };
        debug!(len = map.len(), "frame region created");

        Ok(Self {
            path,
            map,
            max_payload,
            sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Current (even, when idle) sequence value
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    fn sequence_word(&self) -> &AtomicU32 {
        // SAFETY: mapping is at least HEADER_SIZE bytes and page aligned.
        unsafe { &*(self.map.as_ptr().add(SEQUENCE_OFFSET) as *const AtomicU32) }
    }

    /// Publish a packed BGR24 frame (`stride == width * 3`)
    pub fn publish(
        &mut self,
        frame_id: u32,
        width: u16,
        height: u16,
        timestamp_us: u64,
        pixels: &[u8],
    ) -> Result<()> {
        let stride = width.saturating_mul(3);
        let header = FrameHeader::new(frame_id, width, height, stride, timestamp_us);
        self.publish_with_header(&header, pixels)
    }

    /// Publish an arbitrary header and payload
    ///
    /// The header is written as given (except the sequence word), so tests
    /// can place malformed headers in the region.
    pub fn publish_with_header(&mut self, header: &FrameHeader, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(FrameChannelError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }

        self.begin_write();
        let encoded = header.encode();
        self.map[..SEQUENCE_OFFSET].copy_from_slice(&encoded[..SEQUENCE_OFFSET]);
        self.map[SEQUENCE_OFFSET + 4..HEADER_SIZE]
            .copy_from_slice(&encoded[SEQUENCE_OFFSET + 4..HEADER_SIZE]);
        self.map[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
        self.end_write();
        Ok(())
    }

    /// Mark a write in progress (odd sequence)
    pub fn begin_write(&mut self) {
        if self.sequence & 1 == 0 {
            self.sequence = self.sequence.wrapping_add(1);
        }
        self.sequence_word().store(self.sequence, Ordering::Relaxed);
        fence(Ordering::Release);
    }

    /// Close the write (even sequence)
    pub fn end_write(&mut self) {
        if self.sequence & 1 == 1 {
            self.sequence = self.sequence.wrapping_add(1);
        }
        self.sequence_word().store(self.sequence, Ordering::Release);
    }

    pub fn flush(&self) -> Result<()> {
        self.map.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameChannel;
    use contracts::{ReadStatus, RegionConfig};

    fn config(path: &Path) -> RegionConfig {
        RegionConfig {
            path: path.to_path_buf(),
            max_roi: 8,
        }
    }

    #[test]
    fn test_writer_sizes_region() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let writer = FrameWriter::create(&path, 8).unwrap();
        assert_eq!(writer.max_payload(), 8 * 8 * 3);
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len as usize, HEADER_SIZE + 8 * 8 * 3);
    }

    #[test]
    fn test_publish_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let mut writer = FrameWriter::create(&path, 8).unwrap();
        let mut channel = FrameChannel::open(&config(&path));

        // region exists but holds no frame yet
        assert_eq!(channel.read_latest().status(), ReadStatus::HeaderInvalid);

        let pixels: Vec<u8> = (0..4 * 4 * 3).map(|i| i as u8).collect();
        writer.publish(1, 4, 4, 42, &pixels).unwrap();
        assert_eq!(writer.sequence(), 2);

        let frame = channel.read_latest().into_frame().unwrap();
        assert_eq!(frame.frame_id, 1);
        assert_eq!(frame.timestamp_us, 42);
        assert_eq!(frame.data.as_ref(), pixels.as_slice());
        assert_eq!(channel.read_latest().status(), ReadStatus::FrameUnchanged);
    }

    #[test]
    fn test_read_during_write_is_unstable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let mut writer = FrameWriter::create(&path, 8).unwrap();
        let mut channel = FrameChannel::open(&config(&path));

        writer.publish(1, 2, 2, 0, &[0u8; 12]).unwrap();
        writer.begin_write();
        assert_eq!(channel.read_latest().status(), ReadStatus::SequenceUnstable);
        writer.end_write();
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = FrameWriter::create(dir.path().join("region"), 2).unwrap();
        let err = writer.publish(1, 4, 4, 0, &[0u8; 48]).unwrap_err();
        assert!(matches!(err, FrameChannelError::PayloadTooLarge { .. }));
        assert_eq!(writer.sequence(), 0);
    }
}
