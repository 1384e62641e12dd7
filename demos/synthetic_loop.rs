//! Synthetic Loop Demo
//!
//! Runs the whole frame-to-correction loop in one process: a mock producer
//! publishes a moving figure into a temporary region, the control loop tracks
//! it, and a local UDP receiver prints the decoded correction packets.
//!
//! Run with: cargo run --bin synthetic_loop [config.toml]

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{CorrectionPacket, MonotonicClock, TrackerBlueprint};
use frame_channel::{FrameChannel, FrameWriter, MockProducer, MockProducerConfig};
use observability::{Diagnostics, LogFormat, ObservabilityConfig};
use tokio::net::UdpSocket;
use tracker::Tracker;
use trackloop_cli::perception::build_detector;
use trackloop_cli::pipeline::{ControlLoop, LoopContext, LoopLimits, TokioScheduler};
use transport::{TelemetryTransport, UdpSink};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_with_config(ObservabilityConfig {
        log_format: LogFormat::Compact,
        ..Default::default()
    })?;

    tracing::info!("Starting Synthetic Loop Demo");

    // ==== Stage 1: Use default config or load from file ====
    let mut blueprint = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading blueprint config");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        TrackerBlueprint::default()
    };
    if !blueprint.perception.asset.exists() {
        blueprint.perception.asset = "assets/markers.json".into();
    }

    // ==== Stage 2: Region + producer ====
    let dir = tempfile::tempdir()?;
    blueprint.region.path = dir.path().join("region");
    let writer = FrameWriter::create(&blueprint.region.path, blueprint.region.max_roi)?;
    let producer = MockProducer::new(MockProducerConfig {
        width: blueprint.region.max_roi,
        height: blueprint.region.max_roi,
        fps: 60.0,
        ..Default::default()
    });
    let producer_handle = producer.start(writer);
    tracing::info!(region = %blueprint.region.path.display(), "Mock producer started");

    // ==== Stage 3: Local actuation endpoint ====
    let receiver = UdpSocket::bind("127.0.0.1:0").await?;
    let target = receiver.local_addr()?;
    let receiver_handle = tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let mut received = 0u64;
        while let Ok(n) = receiver.recv(&mut buf).await {
            match CorrectionPacket::decode(&buf[..n]) {
                Ok(packet) => {
                    received += 1;
                    if packet.dx != 0.0 || packet.dy != 0.0 || !packet.has_target {
                        tracing::info!(
                            frame_id = packet.frame_id,
                            has_target = packet.has_target,
                            dx = packet.dx,
                            dy = packet.dy,
                            "Correction received"
                        );
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Bad packet"),
            }
        }
        received
    });

    // ==== Stage 4: Control loop ====
    let sink = UdpSink::connect_addr("demo", target).await?;
    let context = LoopContext::new(
        TelemetryTransport::new(sink, blueprint.transport.error_log_interval()),
        Diagnostics::new(
            &contracts::DiagnosticsConfig {
                enabled: true,
                interval_ms: 1000,
            },
            MonotonicClock::new(),
        ),
        blueprint.transport.error_log_interval(),
    );
    let mut control = ControlLoop::new(
        FrameChannel::open(&blueprint.region),
        build_detector(&blueprint.perception)?,
        Tracker::from_blueprint(&blueprint)?,
        context,
        TokioScheduler::new(),
        blueprint.runtime.poll_interval(),
    )
    .with_limits(LoopLimits {
        max_frames: Some(300),
        timeout: Some(Duration::from_secs(15)),
    });

    let stop = Arc::new(AtomicBool::new(false));
    let exit = control.run(&stop).await;
    let stats = control.shutdown().await;

    // ==== Stage 5: Teardown ====
    producer.stop();
    if producer_handle.join().is_err() {
        tracing::warn!("Producer thread panicked");
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    receiver_handle.abort();

    tracing::info!(exit = ?exit, published = producer.published(), "Demo finished");
    stats.print_summary();

    Ok(())
}
