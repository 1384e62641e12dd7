//! Control loop - read frame, detect, track, transmit.
//!
//! 单线程协作式循环：每次迭代轮询一次 [`FrameChannel`]，无新帧则通过
//! [`Scheduler`] 休眠一个轮询间隔；有新帧则执行感知、跟踪并发送修正量。
//! 取消只在迭代边界生效。

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use contracts::{
    Correction, CorrectionSink, MonotonicClock, PerceptionAdapter, ReadOutcome, ReadStatus,
    Scheduler,
};
use frame_channel::{FileRegionSource, FrameChannel, RegionSource};
use observability::Diagnostics;
use tracing::{debug, info, trace, warn};
use tracker::Tracker;
use transport::{Delivery, ErrorThrottle, TelemetryTransport};

use super::LoopStats;
use crate::error::Outcome;

/// Optional run limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopLimits {
    /// Stop after this many processed frames
    pub max_frames: Option<u64>,
    /// Stop after this much scheduler time
    pub timeout: Option<Duration>,
}

/// Why `run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Interrupted,
    FrameLimit,
    Timeout,
}

impl LoopExit {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Interrupted => Outcome::Interrupted,
            Self::FrameLimit | Self::Timeout => Outcome::Completed,
        }
    }
}

/// Mutable state owned by one run: transport edge state, counters, toggles
pub struct LoopContext<S: CorrectionSink> {
    transport: TelemetryTransport<S>,
    diagnostics: Diagnostics,
    stats: LoopStats,
    perception_log: ErrorThrottle<MonotonicClock>,
}

impl<S: CorrectionSink> LoopContext<S> {
    pub fn new(
        transport: TelemetryTransport<S>,
        diagnostics: Diagnostics,
        error_log_interval: Duration,
    ) -> Self {
        Self {
            transport,
            diagnostics,
            stats: LoopStats::default(),
            perception_log: ErrorThrottle::new(MonotonicClock::new(), error_log_interval),
        }
    }

    /// Whether the previous processed frame had a target
    pub fn last_has_target(&self) -> bool {
        self.transport.target_present()
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn transport(&self) -> &TelemetryTransport<S> {
        &self.transport
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

pub struct ControlLoop<P, S, Sch, R = FileRegionSource>
where
    P: PerceptionAdapter,
    S: CorrectionSink,
    Sch: Scheduler,
    R: RegionSource,
{
    channel: FrameChannel<R>,
    perception: P,
    tracker: Tracker,
    context: LoopContext<S>,
    scheduler: Sch,
    poll_interval: Duration,
    limits: LoopLimits,
}

impl<P, S, Sch, R> ControlLoop<P, S, Sch, R>
where
    P: PerceptionAdapter,
    S: CorrectionSink,
    Sch: Scheduler,
    R: RegionSource,
{
    pub fn new(
        channel: FrameChannel<R>,
        perception: P,
        tracker: Tracker,
        context: LoopContext<S>,
        scheduler: Sch,
        poll_interval: Duration,
    ) -> Self {
        Self {
            channel,
            perception,
            tracker,
            context,
            scheduler,
            poll_interval,
            limits: LoopLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn context(&self) -> &LoopContext<S> {
        &self.context
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Iterate until stopped or a limit is hit
    ///
    /// `stop` is checked once per iteration, never mid-iteration.
    pub async fn run(&mut self, stop: &AtomicBool) -> LoopExit {
        let started = self.scheduler.now();
        info!(
            perception = %self.perception.name(),
            profile = %self.tracker.profile(),
            poll_us = self.poll_interval.as_micros() as u64,
            max_frames = ?self.limits.max_frames,
            timeout = ?self.limits.timeout,
            "control loop started"
        );

        let exit = loop {
            if stop.load(Ordering::Relaxed) {
                break LoopExit::Interrupted;
            }
            if self
                .limits
                .max_frames
                .is_some_and(|max| self.context.stats.frames >= max)
            {
                break LoopExit::FrameLimit;
            }
            if self
                .limits
                .timeout
                .is_some_and(|t| self.scheduler.now().saturating_sub(started) >= t)
            {
                break LoopExit::Timeout;
            }
            self.step().await;
        };

        self.context.stats.duration = self.scheduler.now().saturating_sub(started);
        info!(exit = ?exit, frames = self.context.stats.frames, "control loop stopped");
        exit
    }

    /// One iteration; returns the read status it observed
    pub async fn step(&mut self) -> ReadStatus {
        let outcome = self.channel.read_latest();
        let status = outcome.status();
        observability::record_frame_read(status);
        self.context.diagnostics.on_read(status);
        self.context.stats.record_read(status);

        match outcome {
            ReadOutcome::Idle(status) => {
                trace!(status = %status, "no fresh frame");
                self.context.diagnostics.maybe_report();
                self.scheduler.sleep(self.poll_interval).await;
            }
            ReadOutcome::Frame(frame) => {
                observability::record_last_frame_id(frame.frame_id);
                self.context.stats.last_frame_id = Some(frame.frame_id);

                let started = self.context.diagnostics.now();
                let detections = match self.perception.detect(&frame) {
                    Ok(detections) => detections,
                    Err(e) => {
                        self.context.stats.perception_errors += 1;
                        if self.context.perception_log.allow() {
                            warn!(frame_id = frame.frame_id, error = %e, "perception failed");
                        }
                        Vec::new()
                    }
                };
                if let Some(started) = started {
                    let ms = self.context.diagnostics.elapsed_ms(started);
                    observability::record_inference_ms(ms);
                    self.context.diagnostics.on_infer(ms, None);
                    self.context.stats.inference_ms.push(ms);
                }

                let correction = self.tracker.step(&detections, frame.width, frame.height);
                if correction.has_target {
                    self.context.stats.targets += 1;
                }
                self.publish(frame.frame_id, &correction).await;
                self.context.diagnostics.maybe_report();
            }
        }
        status
    }

    async fn publish(&mut self, frame_id: u32, correction: &Correction) {
        match self.context.transport.publish(frame_id, correction).await {
            Delivery::Sent => self.context.diagnostics.on_send(true, false),
            Delivery::Released => self.context.diagnostics.on_send(true, true),
            Delivery::Failed => self
                .context
                .diagnostics
                .on_send(false, !correction.has_target),
            Delivery::Skipped => {}
        }
    }

    /// Disengage and release resources; returns the final statistics
    ///
    /// If a target was engaged, one release packet goes out first.
    pub async fn shutdown(mut self) -> LoopStats {
        if self.context.last_has_target() {
            let frame_id = self.context.stats.last_frame_id.unwrap_or(0);
            debug!(frame_id, "releasing engaged target on shutdown");
            self.publish(frame_id, &Correction::NONE).await;
        }
        self.context.transport.close().await;
        self.channel.close();

        let mut stats = self.context.stats;
        stats.transport = self.context.transport.metrics().snapshot();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BoundingBox, Clock, ContractError, CorrectionPacket, Detection, Frame, ManualClock,
        ManualScheduler, RegionConfig, TrackerBlueprint,
    };
    use frame_channel::FrameWriter;

    /// Emits a primary detection at a fixed spot while `visible`
    struct ScriptedPerception {
        visible: Vec<bool>,
        calls: usize,
    }

    impl PerceptionAdapter for ScriptedPerception {
        fn name(&self) -> &str {
            "scripted"
        }

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, ContractError> {
            let visible = self.visible.get(self.calls).copied().unwrap_or(false);
            self.calls += 1;
            if visible {
                Ok(vec![Detection::new(
                    1,
                    0.9,
                    BoundingBox::new(10.0, 10.0, 30.0, 30.0),
                )])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        packets: Vec<CorrectionPacket>,
    }

    impl CorrectionSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&mut self, packet: &CorrectionPacket) -> Result<(), ContractError> {
            self.packets.push(*packet);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    struct Harness {
        writer: FrameWriter,
        control: ControlLoop<ScriptedPerception, RecordingSink, ManualScheduler>,
        scheduler: ManualScheduler,
        _dir: tempfile::TempDir,
    }

    fn harness(visible: Vec<bool>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let writer = FrameWriter::create(&path, 64).unwrap();
        let region = RegionConfig { path, max_roi: 64 };

        let blueprint = TrackerBlueprint::default();
        let tracker = Tracker::from_blueprint(&blueprint).unwrap();
        let transport = TelemetryTransport::new(RecordingSink::default(), Duration::from_secs(1));
        let context = LoopContext::new(
            transport,
            Diagnostics::disabled(MonotonicClock::new()),
            Duration::from_secs(1),
        );
        let scheduler = ManualScheduler::new(ManualClock::new());
        let control = ControlLoop::new(
            FrameChannel::open(&region),
            ScriptedPerception { visible, calls: 0 },
            tracker,
            context,
            scheduler.clone(),
            Duration::from_millis(1),
        );

        Harness {
            writer,
            control,
            scheduler,
            _dir: dir,
        }
    }

    fn publish(writer: &mut FrameWriter, frame_id: u32) {
        let pixels = vec![0u8; 64 * 64 * 3];
        writer.publish(frame_id, 64, 64, 0, &pixels).unwrap();
    }

    #[tokio::test]
    async fn test_idle_iteration_sleeps_poll_interval() {
        let mut h = harness(vec![]);
        // region exists but nothing published yet: frame 0 header is zeroed
        let status = h.control.step().await;
        assert_ne!(status, ReadStatus::Ok);
        assert_eq!(h.scheduler.sleep_count(), 1);
        assert_eq!(h.scheduler.clock().now(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_frame_processed_once() {
        let mut h = harness(vec![true, true]);
        publish(&mut h.writer, 1);

        assert_eq!(h.control.step().await, ReadStatus::Ok);
        assert_eq!(h.control.step().await, ReadStatus::FrameUnchanged);
        assert_eq!(h.control.context().stats().frames, 1);
        assert_eq!(h.control.context().transport().sink().packets.len(), 1);
        assert!(h.control.context().last_has_target());
    }

    #[tokio::test]
    async fn test_frames_flow_after_producer_restart() {
        let mut h = harness(vec![true; 30]);
        for frame_id in 481..=500 {
            publish(&mut h.writer, frame_id);
        }
        assert_eq!(h.control.step().await, ReadStatus::Ok);

        let path = h.writer.path().to_path_buf();
        h.writer = FrameWriter::create(&path, 64).unwrap();
        assert_eq!(h.control.step().await, ReadStatus::HeaderInvalid);

        for frame_id in 1..=3 {
            publish(&mut h.writer, frame_id);
            assert_eq!(h.control.step().await, ReadStatus::Ok);
        }
        assert_eq!(h.control.context().stats().frames, 4);
        assert_eq!(h.control.context().stats().last_frame_id, Some(3));
    }

    #[tokio::test]
    async fn test_release_on_target_loss() {
        let mut h = harness(vec![true, false, false]);
        for frame_id in 1..=3 {
            publish(&mut h.writer, frame_id);
            assert_eq!(h.control.step().await, ReadStatus::Ok);
        }

        let packets = &h.control.context().transport().sink().packets;
        assert_eq!(packets.len(), 2);
        assert!(packets[0].has_target);
        assert_eq!(packets[1], CorrectionPacket::release(2));
    }

    #[tokio::test]
    async fn test_frame_limit_and_shutdown_release() {
        let mut h = harness(vec![true, true, true]);
        publish(&mut h.writer, 1);
        h.control.limits.max_frames = Some(1);

        let stop = AtomicBool::new(false);
        assert_eq!(h.control.run(&stop).await, LoopExit::FrameLimit);

        let stats = h.control.shutdown().await;
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.transport.sent, 2);
        assert_eq!(stats.transport.released, 1);
    }

    #[tokio::test]
    async fn test_stop_flag_interrupts_before_next_iteration() {
        let mut h = harness(vec![]);
        let stop = AtomicBool::new(true);
        assert_eq!(h.control.run(&stop).await, LoopExit::Interrupted);
        assert_eq!(h.control.context().stats().iterations, 0);
        assert_eq!(LoopExit::Interrupted.outcome(), Outcome::Interrupted);
    }

    #[tokio::test]
    async fn test_timeout_counts_scheduler_time() {
        let mut h = harness(vec![]);
        h.control.limits.timeout = Some(Duration::from_millis(5));
        let stop = AtomicBool::new(false);
        assert_eq!(h.control.run(&stop).await, LoopExit::Timeout);
        assert_eq!(h.scheduler.sleep_count(), 5);
    }
}
