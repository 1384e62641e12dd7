//! Mock 帧生产者
//!
//! 用于无真实采集端的测试与演示：在灰色背景上绘制一个移动的"人形"
//! (粗略目标色块 + 其上方的精确目标色块)，按固定帧率写入共享区域。

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::BYTES_PER_PIXEL;
use tracing::{debug, warn};

use crate::writer::FrameWriter;

/// 人形色块样式 (BGR)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureStyle {
    pub background: [u8; 3],
    /// Body block (coarse target)
    pub body: [u8; 3],
    /// Head block (precise target)
    pub head: [u8; 3],
    /// Head edge in pixels; body is `2 × head` wide and `4 × head` tall
    pub head_size: u32,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            background: [60, 60, 60],
            body: [40, 200, 40],
            head: [40, 40, 220],
            head_size: 6,
        }
    }
}

/// Render a figure whose head center sits at (`head_x`, `head_y`)
///
/// Returns packed BGR24 pixels. Parts outside the frame are clipped.
pub fn render_figure(
    width: u32,
    height: u32,
    head_x: i64,
    head_y: i64,
    style: &FigureStyle,
) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for _ in 0..width as usize * height as usize {
        pixels.extend_from_slice(&style.background);
    }

    let h = style.head_size as i64;
    let half = h / 2;
    // body below the head
    fill_rect(
        &mut pixels,
        width,
        height,
        (head_x - h, head_y + half + 1),
        (head_x + h, head_y + half + 1 + 4 * h),
        style.body,
    );
    fill_rect(
        &mut pixels,
        width,
        height,
        (head_x - half, head_y - half),
        (head_x + half, head_y + half),
        style.head,
    );
    pixels
}

/// Fill the inclusive rectangle `from..=to`, clipped to the frame
fn fill_rect(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    from: (i64, i64),
    to: (i64, i64),
    color: [u8; 3],
) {
    let x0 = from.0.max(0);
    let y0 = from.1.max(0);
    let x1 = to.0.min(width as i64 - 1);
    let y1 = to.1.min(height as i64 - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let idx = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
            pixels[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&color);
        }
    }
}

/// Mock 生产者配置
#[derive(Debug, Clone)]
pub struct MockProducerConfig {
    pub width: u16,
    pub height: u16,
    /// 发布频率 (Hz)
    pub fps: f64,
    /// Horizontal sweep amplitude in pixels around the frame center
    pub amplitude: f64,
    /// Sweep period in frames
    pub period_frames: u32,
    /// Stop after this many frames (`None` = until stopped)
    pub max_frames: Option<u32>,
    pub style: FigureStyle,
}

impl Default for MockProducerConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            fps: 60.0,
            amplitude: 40.0,
            period_frames: 240,
            max_frames: None,
            style: FigureStyle::default(),
        }
    }
}

impl MockProducerConfig {
    /// Head position for a given frame index
    pub fn head_position(&self, index: u32) -> (i64, i64) {
        let phase = 2.0 * std::f64::consts::PI * (index % self.period_frames.max(1)) as f64
            / self.period_frames.max(1) as f64;
        let cx = self.width as f64 / 2.0 + self.amplitude * phase.sin();
        let cy = self.height as f64 / 2.0 - 20.0 + 0.25 * self.amplitude * (2.0 * phase).sin();
        (cx.round() as i64, cy.round() as i64)
    }
}

/// Mock 帧生产者
///
/// 在独立线程中运行，持有 [`FrameWriter`]。
pub struct MockProducer {
    config: MockProducerConfig,
    running: Arc<AtomicBool>,
    published: Arc<AtomicU32>,
}

impl MockProducer {
    pub fn new(config: MockProducerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            published: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Frames published so far
    pub fn published(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start publishing on a background thread
    ///
    /// The thread hands the writer back when it finishes.
    pub fn start(&self, mut writer: FrameWriter) -> JoinHandle<FrameWriter> {
        let config = self.config.clone();
        let running = self.running.clone();
        let published = self.published.clone();
        running.store(true, Ordering::SeqCst);

        thread::spawn(move || {
            let interval = Duration::from_secs_f64(1.0 / config.fps.max(1.0));
            let origin = Instant::now();
            let mut frame_id: u32 = 0;

            debug!(
                width = config.width,
                height = config.height,
                fps = config.fps,
                "mock producer started"
            );

            while running.load(Ordering::Relaxed) {
                if config.max_frames.is_some_and(|max| frame_id >= max) {
                    break;
                }
                frame_id = frame_id.wrapping_add(1);

                let (hx, hy) = config.head_position(frame_id);
                let pixels = render_figure(
                    config.width as u32,
                    config.height as u32,
                    hx,
                    hy,
                    &config.style,
                );
                let timestamp_us = origin.elapsed().as_micros() as u64;
                let published_frame = writer.publish(
                    frame_id,
                    config.width,
                    config.height,
                    timestamp_us,
                    &pixels,
                );
                if let Err(e) = published_frame {
                    warn!(error = %e, "mock producer publish failed");
                    break;
                }
                published.fetch_add(1, Ordering::Relaxed);
                thread::sleep(interval);
            }

            running.store(false, Ordering::SeqCst);
            debug!(frames = frame_id, "mock producer stopped");
            writer
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for MockProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameChannel;
    use contracts::{ReadStatus, RegionConfig};

    #[test]
    fn test_render_places_head_and_body() {
        let style = FigureStyle::default();
        let pixels = render_figure(64, 64, 32, 20, &style);
        let at = |x: usize, y: usize| {
            let idx = (y * 64 + x) * 3;
            [pixels[idx], pixels[idx + 1], pixels[idx + 2]]
        };
        assert_eq!(at(32, 20), style.head);
        assert_eq!(at(32, 30), style.body);
        assert_eq!(at(5, 5), style.background);
    }

    #[test]
    fn test_render_clips_at_edges() {
        let style = FigureStyle::default();
        let pixels = render_figure(16, 16, -2, 15, &style);
        assert_eq!(pixels.len(), 16 * 16 * 3);
    }

    #[test]
    fn test_producer_publishes_bounded_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let writer = FrameWriter::create(&path, 64).unwrap();
        let producer = MockProducer::new(MockProducerConfig {
            width: 64,
            height: 64,
            fps: 500.0,
            max_frames: Some(5),
            ..Default::default()
        });

        let writer = producer.start(writer).join().unwrap();
        assert_eq!(producer.published(), 5);
        assert!(!producer.is_running());
        assert_eq!(writer.sequence(), 10);

        let mut channel = FrameChannel::open(&RegionConfig {
            path,
            max_roi: 64,
        });
        let outcome = channel.read_latest();
        assert_eq!(outcome.status(), ReadStatus::Ok);
        assert_eq!(outcome.into_frame().unwrap().frame_id, 5);
    }
}
