//! Seqlock frame reader
//!
//! 读取顺序 (与写端协议严格对应):
//! 1. 确保映射存在
//! 2. 读取 sequence S1，奇数表示写入中，直接返回 (不拷贝载荷)
//! 3. 拷贝并校验头部
//! 4. frame_id 未前进则返回 FrameUnchanged (sequence 回退视为生产者重启，先 resync)
//! 5. 拷贝载荷，再读 sequence S2，S1 != S2 或 S2 为奇数则丢弃
//! 6. 提交 last_frame_id，去除行填充后返回

use std::sync::atomic::{fence, Ordering};

use contracts::{
    Frame, FrameHeader, ReadOutcome, ReadStatus, RegionConfig, HEADER_SIZE,
};
use tracing::{debug, info, instrument, trace};

use crate::region::{FileRegionSource, RegionSource, SharedRegion};

/// Consumer side of the shared-memory frame channel
///
/// Owns the mapping and the last delivered frame id. Never blocks and never
/// writes to the region.
pub struct FrameChannel<S: RegionSource = FileRegionSource> {
    source: S,
    region: Option<S::Region>,
    max_payload: usize,
    last_frame_id: Option<u32>,
    /// Sequence observed with the last delivered frame
    last_sequence: Option<u32>,
    header_buf: [u8; HEADER_SIZE],
    payload_buf: Vec<u8>,
}

impl FrameChannel<FileRegionSource> {
    /// Channel over the configured region file (mapped lazily)
    pub fn open(config: &RegionConfig) -> Self {
        Self::with_source(FileRegionSource::from_config(config), config.max_payload())
    }
}

impl<S: RegionSource> FrameChannel<S> {
    pub fn with_source(source: S, max_payload: usize) -> Self {
        Self {
            source,
            region: None,
            max_payload,
            last_frame_id: None,
            last_sequence: None,
            header_buf: [0u8; HEADER_SIZE],
            payload_buf: Vec::with_capacity(max_payload),
        }
    }

    /// Whether a mapping is currently held
    pub fn is_mapped(&self) -> bool {
        self.region.is_some()
    }

    /// Id of the last frame returned with `Ok`
    pub fn last_frame_id(&self) -> Option<u32> {
        self.last_frame_id
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Poll once for a newer, consistent frame
    pub fn read_latest(&mut self) -> ReadOutcome {
        if self.region.is_none() {
            match self.source.open() {
                Ok(region) => {
                    info!(region = %self.source.describe(), "frame channel mapped");
                    self.region = Some(region);
                }
                Err(e) => {
                    trace!(error = %e, "region not available yet");
                    return ReadOutcome::Idle(ReadStatus::MappingUnavailable);
                }
            }
        }
        let Some(region) = self.region.as_ref() else {
            return ReadOutcome::Idle(ReadStatus::MappingUnavailable);
        };

        let seq1 = region.load_sequence();
        if seq1 & 1 == 1 {
            return ReadOutcome::Idle(ReadStatus::SequenceUnstable);
        }

        if !region.copy_into(0, &mut self.header_buf) {
            return ReadOutcome::Idle(ReadStatus::HeaderInvalid);
        }
        let header = match FrameHeader::decode(&self.header_buf) {
            Ok(header) => header,
            Err(_) => return ReadOutcome::Idle(ReadStatus::HeaderInvalid),
        };
        if let Err(fault) = header.check(self.max_payload) {
            debug!(fault = fault.as_str(), seq = seq1, "frame header rejected");
            return ReadOutcome::Idle(ReadStatus::HeaderInvalid);
        }

        let payload_size = header.payload_size as usize;
        if HEADER_SIZE + payload_size > region.len() {
            debug!(
                payload_size,
                mapped = region.len(),
                "frame payload exceeds mapping"
            );
            return ReadOutcome::Idle(ReadStatus::HeaderInvalid);
        }

        if let Some(last) = self.last_frame_id {
            if !is_newer(header.frame_id, last) {
                if !self.producer_restarted(seq1) {
                    return ReadOutcome::Idle(ReadStatus::FrameUnchanged);
                }
                info!(
                    frame_id = header.frame_id,
                    last_frame_id = last,
                    seq = seq1,
                    "producer restarted, resyncing frame channel"
                );
                // Same as `self.resync()`, written with disjoint field borrows
                // because `region` still borrows `self.region`.
                self.last_frame_id = None;
                self.last_sequence = None;
            }
        }

        self.payload_buf.resize(payload_size, 0);
        if !region.copy_into(HEADER_SIZE, &mut self.payload_buf) {
            return ReadOutcome::Idle(ReadStatus::HeaderInvalid);
        }

        fence(Ordering::Acquire);
        let seq2 = region.load_sequence();
        if seq1 != seq2 || seq2 & 1 == 1 {
            trace!(seq1, seq2, "torn read discarded");
            return ReadOutcome::Idle(ReadStatus::SequenceUnstable);
        }

        match Frame::from_strided(&header, &self.payload_buf) {
            Ok(frame) => {
                self.last_frame_id = Some(header.frame_id);
                self.last_sequence = Some(seq1);
                ReadOutcome::Frame(frame)
            }
            Err(e) => {
                debug!(error = %e, "frame materialization failed");
                ReadOutcome::Idle(ReadStatus::HeaderInvalid)
            }
        }
    }

    /// Forget the last delivered id so the next consistent frame is accepted
    ///
    /// Used after the producer restarts with a fresh counter.
    pub fn resync(&mut self) {
        self.last_frame_id = None;
        self.last_sequence = None;
    }

    /// A writer only ever advances the sequence; a rewind means the region
    /// was recreated and the frame counter started over.
    fn producer_restarted(&self, seq: u32) -> bool {
        self.last_sequence
            .is_some_and(|last| seq != last && !is_newer(seq, last))
    }

    /// Drop the mapping; the next read re-opens the region
    #[instrument(name = "frame_channel_close", skip(self))]
    pub fn close(&mut self) {
        if self.region.take().is_some() {
            debug!(region = %self.source.describe(), "frame channel unmapped");
        }
        self.resync();
    }
}

/// Serial-number comparison: `id` is ahead of `last` by less than half the space
#[inline]
fn is_newer(id: u32, last: u32) -> bool {
    (id.wrapping_sub(last) as i32) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FrameChannelError, Result};
    use contracts::{FrameHeader, SEQUENCE_OFFSET};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Region whose sequence reads follow a script
    #[derive(Default)]
    struct Script {
        bytes: Vec<u8>,
        sequences: VecDeque<u32>,
        payload_copies: usize,
    }

    #[derive(Clone, Default)]
    struct ScriptedRegion(Arc<Mutex<Script>>);

    impl SharedRegion for ScriptedRegion {
        fn len(&self) -> usize {
            self.0.lock().unwrap().bytes.len()
        }

        fn load_sequence(&self) -> u32 {
            let mut script = self.0.lock().unwrap();
            match script.sequences.pop_front() {
                Some(seq) => seq,
                None => u32::from_le_bytes(
                    script.bytes[SEQUENCE_OFFSET..SEQUENCE_OFFSET + 4]
                        .try_into()
                        .unwrap(),
                ),
            }
        }

        fn copy_into(&self, offset: usize, dst: &mut [u8]) -> bool {
            let mut script = self.0.lock().unwrap();
            if offset + dst.len() > script.bytes.len() {
                return false;
            }
            if offset >= HEADER_SIZE {
                script.payload_copies += 1;
            }
            dst.copy_from_slice(&script.bytes[offset..offset + dst.len()]);
            true
        }
    }

    struct ScriptedSource {
        region: Option<ScriptedRegion>,
    }

    impl RegionSource for ScriptedSource {
        type Region = ScriptedRegion;

        fn describe(&self) -> String {
            "scripted".into()
        }

        fn open(&mut self) -> Result<ScriptedRegion> {
            self.region
                .clone()
                .ok_or_else(|| FrameChannelError::RegionMissing {
                    path: "scripted".into(),
                })
        }
    }

    const MAX_PAYLOAD: usize = 16 * 16 * 3;

    fn publish(region: &ScriptedRegion, header: &FrameHeader, payload: &[u8]) {
        let mut script = region.0.lock().unwrap();
        script.bytes = vec![0u8; HEADER_SIZE + MAX_PAYLOAD];
        script.bytes[..HEADER_SIZE].copy_from_slice(&header.encode());
        script.bytes[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
    }

    fn channel_with(
        header: &FrameHeader,
        payload: &[u8],
    ) -> (FrameChannel<ScriptedSource>, ScriptedRegion) {
        let region = ScriptedRegion::default();
        publish(&region, header, payload);
        let source = ScriptedSource {
            region: Some(region.clone()),
        };
        (FrameChannel::with_source(source, MAX_PAYLOAD), region)
    }

    fn header(frame_id: u32, seq: u32) -> FrameHeader {
        let mut header = FrameHeader::new(frame_id, 2, 2, 6, 1_000);
        header.sequence = seq;
        header
    }

    fn payload() -> Vec<u8> {
        (0u8..12).collect()
    }

    #[test]
    fn test_unmapped_region_is_retried() {
        let source = ScriptedSource { region: None };
        let mut channel = FrameChannel::with_source(source, MAX_PAYLOAD);
        assert_eq!(channel.read_latest().status(), ReadStatus::MappingUnavailable);
        assert_eq!(channel.read_latest().status(), ReadStatus::MappingUnavailable);

        let region = ScriptedRegion::default();
        publish(&region, &header(1, 2), &payload());
        channel.source.region = Some(region);
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        assert!(channel.is_mapped());
    }

    #[test]
    fn test_consistent_frame_delivered() {
        let (mut channel, _) = channel_with(&header(5, 2), &payload());
        let frame = channel.read_latest().into_frame().unwrap();
        assert_eq!(frame.frame_id, 5);
        assert_eq!((frame.width, frame.height), (2, 2));
        assert_eq!(frame.data.as_ref(), payload().as_slice());
        assert_eq!(channel.last_frame_id(), Some(5));
    }

    #[test]
    fn test_odd_sequence_skips_payload_copy() {
        let (mut channel, region) = channel_with(&header(5, 3), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::SequenceUnstable);
        assert_eq!(region.0.lock().unwrap().payload_copies, 0);
        assert_eq!(channel.last_frame_id(), None);
    }

    #[test]
    fn test_sequence_change_during_copy_discards_frame() {
        let (mut channel, region) = channel_with(&header(5, 2), &payload());
        region.0.lock().unwrap().sequences = VecDeque::from([2, 4]);
        assert_eq!(channel.read_latest().status(), ReadStatus::SequenceUnstable);
        assert_eq!(region.0.lock().unwrap().payload_copies, 1);
        assert_eq!(channel.last_frame_id(), None);

        // producer settled: same frame is now delivered
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
    }

    #[test]
    fn test_writer_entered_during_copy_discards_frame() {
        let (mut channel, region) = channel_with(&header(5, 2), &payload());
        region.0.lock().unwrap().sequences = VecDeque::from([2, 3]);
        assert_eq!(channel.read_latest().status(), ReadStatus::SequenceUnstable);
    }

    #[test]
    fn test_same_frame_id_only_once() {
        let (mut channel, region) = channel_with(&header(9, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        assert_eq!(channel.read_latest().status(), ReadStatus::FrameUnchanged);
        assert_eq!(channel.read_latest().status(), ReadStatus::FrameUnchanged);
        assert_eq!(region.0.lock().unwrap().payload_copies, 1);

        publish(&region, &header(10, 4), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
    }

    #[test]
    fn test_older_frame_id_is_unchanged() {
        let (mut channel, region) = channel_with(&header(9, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        publish(&region, &header(8, 4), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::FrameUnchanged);
    }

    #[test]
    fn test_frame_zero_accepted_first() {
        let (mut channel, _) = channel_with(&header(0, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
    }

    #[test]
    fn test_frame_id_wraparound_is_newer() {
        let (mut channel, region) = channel_with(&header(u32::MAX, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        publish(&region, &header(0, 4), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        assert_eq!(channel.last_frame_id(), Some(0));
    }

    #[test]
    fn test_resync_accepts_restarted_producer() {
        let (mut channel, region) = channel_with(&header(500, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        publish(&region, &header(1, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::FrameUnchanged);
        channel.resync();
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
    }

    #[test]
    fn test_sequence_rewind_resyncs_automatically() {
        let (mut channel, region) = channel_with(&header(500, 1000), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);

        // region recreated: counter and sequence both start over
        publish(&region, &header(1, 2), &payload());
        let frame = channel.read_latest().into_frame().unwrap();
        assert_eq!(frame.frame_id, 1);
        assert_eq!(channel.read_latest().status(), ReadStatus::FrameUnchanged);

        publish(&region, &header(2, 4), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        assert_eq!(channel.last_frame_id(), Some(2));
    }

    #[test]
    fn test_payload_stride_mismatch_is_header_invalid() {
        let mut bad = header(1, 2);
        bad.payload_size = 10;
        let (mut channel, region) = channel_with(&bad, &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::HeaderInvalid);
        assert_eq!(region.0.lock().unwrap().payload_copies, 0);
    }

    #[test]
    fn test_pixel_format_mismatch_is_header_invalid() {
        let mut bad = header(1, 2);
        bad.pixel_format = 2;
        let (mut channel, _) = channel_with(&bad, &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::HeaderInvalid);
    }

    #[test]
    fn test_identity_faults_are_header_invalid() {
        for mutate in [
            (|h: &mut FrameHeader| h.magic = 0) as fn(&mut FrameHeader),
            |h| h.version = 7,
            |h| h.header_size = 64,
            |h| h.width = 1,
            |h| {
                h.stride = 4;
                h.payload_size = 8;
            },
        ] {
            let mut bad = header(1, 2);
            mutate(&mut bad);
            let (mut channel, _) = channel_with(&bad, &payload());
            assert_eq!(channel.read_latest().status(), ReadStatus::HeaderInvalid);
        }
    }

    #[test]
    fn test_payload_above_max_is_header_invalid() {
        let big = FrameHeader::new(1, 32, 32, 96, 0);
        let (mut channel, _) = channel_with(&big, &[]);
        assert_eq!(channel.read_latest().status(), ReadStatus::HeaderInvalid);
    }

    #[test]
    fn test_payload_beyond_mapping_is_header_invalid() {
        let region = ScriptedRegion::default();
        {
            let mut script = region.0.lock().unwrap();
            script.bytes = vec![0u8; HEADER_SIZE + 6];
            script.bytes[..HEADER_SIZE].copy_from_slice(&header(1, 2).encode());
        }
        let source = ScriptedSource {
            region: Some(region),
        };
        let mut channel = FrameChannel::with_source(source, MAX_PAYLOAD);
        assert_eq!(channel.read_latest().status(), ReadStatus::HeaderInvalid);
    }

    #[test]
    fn test_row_padding_is_stripped() {
        let padded = FrameHeader::new(3, 2, 2, 8, 0);
        let payload = [1, 2, 3, 4, 5, 6, 0xEE, 0xEE, 7, 8, 9, 10, 11, 12, 0xEE, 0xEE];
        let (mut channel, _) = channel_with(&padded, &payload);
        let frame = channel.read_latest().into_frame().unwrap();
        assert_eq!(frame.data.as_ref(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_close_forgets_mapping() {
        let (mut channel, _) = channel_with(&header(1, 2), &payload());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
        channel.close();
        assert!(!channel.is_mapped());
        assert_eq!(channel.read_latest().status(), ReadStatus::Ok);
    }

    #[test]
    fn test_is_newer_serial_compare() {
        assert!(is_newer(2, 1));
        assert!(!is_newer(1, 1));
        assert!(!is_newer(1, 2));
        assert!(is_newer(3, u32::MAX - 2));
    }
}
