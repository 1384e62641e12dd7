//! 性能诊断 (windowed perf monitor)
//!
//! 统计一个固定时间窗口内的帧读取、推理耗时、帧龄与发送结果，
//! 窗口结束时输出一行汇总并清零。
//!
//! Disabled diagnostics never touch the clock: every hook returns before
//! reading time, and [`Diagnostics::now`] yields `None`.

use std::fmt;
use std::time::Duration;

use contracts::{Clock, DiagnosticsConfig, MonotonicClock, ReadStatus};
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Default)]
struct Window {
    start: Duration,
    reads: [u64; 5],
    captured: u64,
    infer_count: u64,
    infer_ms_sum: f64,
    frame_age_count: u64,
    frame_age_ms_sum: f64,
    send_ok: u64,
    send_fail: u64,
    release: u64,
}

/// One aggregate report line
#[derive(Debug, Clone, PartialEq)]
pub struct PerfReport {
    pub elapsed: Duration,
    pub read_ok: u64,
    pub stale: u64,
    pub seq_fail: u64,
    pub invalid: u64,
    pub no_map: u64,
    pub capture_fps: f64,
    pub infer_fps: f64,
    pub infer_avg_ms: f64,
    pub frame_age_avg_ms: f64,
    pub send_ok: u64,
    pub send_fail: u64,
    pub release: u64,
}

impl fmt::Display for PerfReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "read_ok={} stale={} seq_fail={} invalid={} no_map={} cap={:.1}fps infer={:.1}fps \
             infer_avg={:.2}ms frame_age={:.2}ms send_ok={} send_fail={} release={}",
            self.read_ok,
            self.stale,
            self.seq_fail,
            self.invalid,
            self.no_map,
            self.capture_fps,
            self.infer_fps,
            self.infer_avg_ms,
            self.frame_age_avg_ms,
            self.send_ok,
            self.send_fail,
            self.release
        )
    }
}

/// 窗口化性能统计
///
/// Shared by reference between threads in the in-process pipeline.
pub struct Diagnostics<C: Clock = MonotonicClock> {
    enabled: bool,
    interval: Duration,
    clock: C,
    window: Mutex<Window>,
}

impl<C: Clock> Diagnostics<C> {
    pub fn new(config: &DiagnosticsConfig, clock: C) -> Self {
        let start = if config.enabled {
            clock.now()
        } else {
            Duration::ZERO
        };
        Self {
            enabled: config.enabled,
            interval: config.interval(),
            clock,
            window: Mutex::new(Window {
                start,
                ..Window::default()
            }),
        }
    }

    /// Diagnostics that record nothing
    pub fn disabled(clock: C) -> Self {
        Self::new(
            &DiagnosticsConfig {
                enabled: false,
                ..DiagnosticsConfig::default()
            },
            clock,
        )
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Timestamp for latency measurement; `None` when disabled
    #[inline]
    pub fn now(&self) -> Option<Duration> {
        self.enabled.then(|| self.clock.now())
    }

    /// Milliseconds elapsed since a timestamp returned by [`Self::now`]
    pub fn elapsed_ms(&self, since: Duration) -> f64 {
        self.clock.now().saturating_sub(since).as_secs_f64() * 1000.0
    }

    pub fn on_read(&self, status: ReadStatus) {
        if !self.enabled {
            return;
        }
        self.window.lock().reads[status.index()] += 1;
    }

    pub fn on_capture(&self) {
        if !self.enabled {
            return;
        }
        self.window.lock().captured += 1;
    }

    /// Record one inference; `frame_age_ms` is capture-to-inference delay
    pub fn on_infer(&self, infer_ms: f64, frame_age_ms: Option<f64>) {
        if !self.enabled {
            return;
        }
        let mut window = self.window.lock();
        window.infer_count += 1;
        window.infer_ms_sum += infer_ms;
        if let Some(age) = frame_age_ms {
            window.frame_age_count += 1;
            window.frame_age_ms_sum += age.max(0.0);
        }
    }

    pub fn on_send(&self, ok: bool, release: bool) {
        if !self.enabled {
            return;
        }
        let mut window = self.window.lock();
        if ok {
            window.send_ok += 1;
        } else {
            window.send_fail += 1;
        }
        if release {
            window.release += 1;
        }
    }

    /// Emit and reset the window once `interval` has elapsed
    pub fn maybe_report(&self) -> Option<PerfReport> {
        if !self.enabled {
            return None;
        }

        let now = self.clock.now();
        let report = {
            let mut window = self.window.lock();
            let elapsed = now.saturating_sub(window.start);
            if elapsed < self.interval {
                return None;
            }
            let report = summarize(&window, elapsed);
            *window = Window {
                start: now,
                ..Window::default()
            };
            report
        };

        info!(
            read_ok = report.read_ok,
            stale = report.stale,
            seq_fail = report.seq_fail,
            invalid = report.invalid,
            no_map = report.no_map,
            infer_fps = report.infer_fps,
            infer_avg_ms = report.infer_avg_ms,
            send_ok = report.send_ok,
            send_fail = report.send_fail,
            release = report.release,
            "perf {}",
            report
        );
        Some(report)
    }
}

fn summarize(window: &Window, elapsed: Duration) -> PerfReport {
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    let avg = |sum: f64, count: u64| if count == 0 { 0.0 } else { sum / count as f64 };
    PerfReport {
        elapsed,
        read_ok: window.reads[ReadStatus::Ok.index()],
        stale: window.reads[ReadStatus::FrameUnchanged.index()],
        seq_fail: window.reads[ReadStatus::SequenceUnstable.index()],
        invalid: window.reads[ReadStatus::HeaderInvalid.index()],
        no_map: window.reads[ReadStatus::MappingUnavailable.index()],
        capture_fps: window.captured as f64 / secs,
        infer_fps: window.infer_count as f64 / secs,
        infer_avg_ms: avg(window.infer_ms_sum, window.infer_count),
        frame_age_avg_ms: avg(window.frame_age_ms_sum, window.frame_age_count),
        send_ok: window.send_ok,
        send_fail: window.send_fail,
        release: window.release,
    }
}
