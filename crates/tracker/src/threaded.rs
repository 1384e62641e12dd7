//! In-process threaded pipeline
//!
//! capture 线程 → [`LatestCell`] → vision 线程 → [`CorrectionMailbox`] → actuation 线程
//!
//! - capture: 阻塞读取整帧，只保留最新一帧
//! - vision: 裁剪中心 ROI，感知 + 跟踪，覆盖写入修正量
//! - actuation: 处理输入事件，并按固定节拍取出修正量 (即使没有输入事件)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{Clock, ContractError, Frame, PerceptionAdapter};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use observability::Diagnostics;
use tracing::{debug, info, warn};

use crate::handoff::{CorrectionMailbox, LatestCell};
use crate::tracking::Tracker;

/// Blocking source of full-size frames
pub trait FrameSource: Send + 'static {
    /// Next frame; `None` on a transient miss
    fn capture(&mut self) -> Option<Frame>;
}

/// Operator input (relative motion + button state)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEvent {
    pub dx: i32,
    pub dy: i32,
    /// Button bitmask after this event
    pub buttons: u8,
    pub wheel: i8,
    /// The event carried a button transition
    pub button_changed: bool,
}

/// Combined manual + automatic motion sent to the actuator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveCommand {
    pub dx: i32,
    pub dy: i32,
    pub buttons: u8,
    pub wheel: i8,
}

/// Downstream actuation device
pub trait Actuator: Send + 'static {
    fn emit(&mut self, command: &MoveCommand) -> Result<(), ContractError>;
}

/// 线程化流水线配置
#[derive(Debug, Clone)]
pub struct ThreadedConfig {
    /// Center crop edge applied before perception
    pub roi_size: u32,
    /// Actuation drain period when no input arrives
    pub tick: Duration,
    /// Sleep when a thread has nothing to do
    pub idle_backoff: Duration,
}

impl Default for ThreadedConfig {
    fn default() -> Self {
        Self {
            roi_size: 256,
            tick: Duration::from_millis(2),
            idle_backoff: Duration::from_millis(1),
        }
    }
}

#[derive(Debug)]
struct CapturedFrame {
    frame: Frame,
    captured_at: Option<Duration>,
}

/// Running capture / vision / actuation threads
pub struct ThreadedPipeline {
    shutdown: Arc<AtomicBool>,
    engaged: Arc<AtomicBool>,
    mailbox: Arc<CorrectionMailbox>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadedPipeline {
    pub fn spawn<S, P, A, C>(
        config: ThreadedConfig,
        source: S,
        perception: P,
        tracker: Tracker,
        actuator: A,
        inputs: Receiver<InputEvent>,
        diagnostics: Arc<Diagnostics<C>>,
    ) -> Result<Self, ContractError>
    where
        S: FrameSource,
        P: PerceptionAdapter + 'static,
        A: Actuator,
        C: Clock + 'static,
    {
        let latest = Arc::new(LatestCell::new());
        let mut pipeline = Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            engaged: Arc::new(AtomicBool::new(true)),
            mailbox: Arc::new(CorrectionMailbox::new()),
            handles: Vec::with_capacity(3),
        };

        // a failed spawn drops `pipeline`, which stops the threads already running
        let capture = {
            let shutdown = pipeline.shutdown.clone();
            let latest = latest.clone();
            let diagnostics = diagnostics.clone();
            let backoff = config.idle_backoff;
            thread::Builder::new()
                .name("capture".into())
                .spawn(move || capture_loop(source, &latest, &diagnostics, &shutdown, backoff))?
        };
        pipeline.handles.push(capture);

        let vision = {
            let shutdown = pipeline.shutdown.clone();
            let mailbox = pipeline.mailbox.clone();
            let diagnostics = diagnostics.clone();
            let config = config.clone();
            thread::Builder::new().name("vision".into()).spawn(move || {
                vision_loop(
                    &config,
                    perception,
                    tracker,
                    &latest,
                    &mailbox,
                    &diagnostics,
                    &shutdown,
                )
            })?
        };
        pipeline.handles.push(vision);

        let actuation = {
            let shutdown = pipeline.shutdown.clone();
            let engaged = pipeline.engaged.clone();
            let mailbox = pipeline.mailbox.clone();
            let tick = config.tick;
            thread::Builder::new().name("actuation".into()).spawn(move || {
                actuation_loop(
                    actuator,
                    &inputs,
                    &mailbox,
                    &diagnostics,
                    &engaged,
                    &shutdown,
                    tick,
                )
            })?
        };
        pipeline.handles.push(actuation);

        info!(roi = config.roi_size, "threaded pipeline started");
        Ok(pipeline)
    }

    /// Enable or disable automatic correction (manual input always passes)
    pub fn set_engaged(&self, engaged: bool) {
        self.engaged.store(engaged, Ordering::Relaxed);
        if !engaged {
            self.mailbox.take();
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Relaxed)
    }

    /// Signal all threads and wait for them
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                warn!(error = ?e, "pipeline thread panicked");
            }
        }
    }
}

impl Drop for ThreadedPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop<S: FrameSource, C: Clock>(
    mut source: S,
    latest: &LatestCell<CapturedFrame>,
    diagnostics: &Diagnostics<C>,
    shutdown: &AtomicBool,
    backoff: Duration,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match source.capture() {
            Some(frame) => {
                let captured_at = diagnostics.now();
                latest.put(CapturedFrame { frame, captured_at });
                diagnostics.on_capture();
            }
            None => thread::sleep(backoff),
        }
    }
    debug!("capture thread stopped");
}

fn vision_loop<P: PerceptionAdapter, C: Clock>(
    config: &ThreadedConfig,
    mut perception: P,
    mut tracker: Tracker,
    latest: &LatestCell<CapturedFrame>,
    mailbox: &CorrectionMailbox,
    diagnostics: &Diagnostics<C>,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let Some(captured) = latest.take() else {
            thread::sleep(config.idle_backoff);
            continue;
        };

        let roi = captured.frame.crop_center(config.roi_size);
        let started = diagnostics.now();
        let detections = perception.detect(&roi).unwrap_or_else(|e| {
            warn!(adapter = perception.name(), error = %e, "detection failed");
            Vec::new()
        });
        if let Some(started) = started {
            let age = captured.captured_at.map(|at| diagnostics.elapsed_ms(at));
            diagnostics.on_infer(diagnostics.elapsed_ms(started), age);
        }

        let correction = tracker.step(&detections, roi.width, roi.height);
        mailbox.post(correction.dx as i32, correction.dy as i32);
        diagnostics.maybe_report();
    }
    debug!("vision thread stopped");
}

fn actuation_loop<A: Actuator, C: Clock>(
    mut actuator: A,
    inputs: &Receiver<InputEvent>,
    mailbox: &CorrectionMailbox,
    diagnostics: &Diagnostics<C>,
    engaged: &AtomicBool,
    shutdown: &AtomicBool,
    tick: Duration,
) {
    let mut buttons = 0u8;
    let mut inputs_open = true;

    while !shutdown.load(Ordering::Relaxed) {
        let event = if inputs_open {
            match inputs.recv_timeout(tick) {
                Ok(event) => Some(event),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("input channel closed, draining on tick only");
                    inputs_open = false;
                    None
                }
            }
        } else {
            thread::sleep(tick);
            None
        };

        let (ax, ay) = if engaged.load(Ordering::Relaxed) {
            mailbox.take()
        } else {
            (0, 0)
        };

        let command = match event {
            Some(event) => {
                buttons = event.buttons;
                let command = MoveCommand {
                    dx: event.dx.saturating_add(ax),
                    dy: event.dy.saturating_add(ay),
                    buttons,
                    wheel: event.wheel,
                };
                let moved = command.dx != 0 || command.dy != 0 || command.wheel != 0;
                (moved || event.button_changed).then_some(command)
            }
            None => (ax != 0 || ay != 0).then_some(MoveCommand {
                dx: ax,
                dy: ay,
                buttons,
                wheel: 0,
            }),
        };

        if let Some(command) = command {
            let result = actuator.emit(&command);
            if let Err(e) = &result {
                debug!(error = %e, "actuator emit failed");
            }
            diagnostics.on_send(result.is_ok(), false);
        }
    }
    debug!("actuation thread stopped");
}
