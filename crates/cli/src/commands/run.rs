//! `run` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{ContractError, MonotonicClock, TrackerBlueprint};
use frame_channel::{FrameChannel, FrameWriter, MockProducer, MockProducerConfig};
use observability::Diagnostics;
use tracing::{info, warn};
use tracker::Tracker;
use trackloop_cli::perception::build_detector;
use trackloop_cli::pipeline::{
    verify_protocol, ControlLoop, LoopContext, LoopLimits, TeardownGuard, TokioScheduler,
};
use trackloop_cli::{CliError, Outcome};
use transport::{ConfiguredSink, TelemetryTransport};

use super::load_blueprint;
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_loop(args: &RunArgs) -> Result<Outcome> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    args.overrides().apply(&mut blueprint)?;

    info!(
        region = %blueprint.region.path.display(),
        max_roi = blueprint.region.max_roi,
        target = %blueprint.transport.endpoint(),
        transport = ?blueprint.transport.kind,
        profile = %blueprint.control.profile,
        "Configuration loaded"
    );

    // Fatal startup checks: the loop never starts if any of these fail
    verify_protocol().map_err(CliError::from)?;
    let perception = build_detector(&blueprint.perception).map_err(CliError::from)?;
    let tracker = Tracker::from_blueprint(&blueprint).map_err(CliError::from)?;

    if args.dry_run {
        info!("Dry run mode - configuration and startup checks passed, exiting");
        print_config_summary(&blueprint, &tracker);
        return Ok(Outcome::Completed);
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let mut teardown = TeardownGuard::new();
    if args.synthetic {
        start_synthetic_producer(&blueprint, &mut teardown)?;
    }

    let sink = ConfiguredSink::from_config(&blueprint.transport)
        .await
        .map_err(ContractError::from)
        .map_err(CliError::from)
        .with_context(|| {
            format!(
                "Failed to open transport to {}",
                blueprint.transport.endpoint()
            )
        })?;
    let transport = TelemetryTransport::new(sink, blueprint.transport.error_log_interval());
    let context = LoopContext::new(
        transport,
        Diagnostics::new(&blueprint.diagnostics, MonotonicClock::new()),
        blueprint.transport.error_log_interval(),
    );

    let limits = LoopLimits {
        max_frames: (args.max_frames != 0).then_some(args.max_frames),
        timeout: (args.timeout != 0).then(|| Duration::from_secs(args.timeout)),
    };
    let mut control = ControlLoop::new(
        FrameChannel::open(&blueprint.region),
        perception,
        tracker,
        context,
        TokioScheduler::new(),
        blueprint.runtime.poll_interval(),
    )
    .with_limits(limits);

    let stop = Arc::new(AtomicBool::new(false));
    let signal_task = tokio::spawn(watch_shutdown_signal(stop.clone()));

    info!("Starting control loop...");
    let exit = control.run(&stop).await;
    signal_task.abort();

    let stats = control.shutdown().await;
    teardown.run();

    info!(
        frames = stats.frames,
        sent = stats.transport.sent,
        failed = stats.transport.failed,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Control loop finished"
    );
    stats.print_summary();

    Ok(exit.outcome())
}

/// Publish a synthetic figure into the configured region until teardown
fn start_synthetic_producer(
    blueprint: &TrackerBlueprint,
    teardown: &mut TeardownGuard,
) -> Result<()> {
    let region = &blueprint.region;
    let writer = FrameWriter::create(&region.path, region.max_roi)
        .map_err(ContractError::from)
        .with_context(|| format!("Failed to create region {}", region.path.display()))?;

    let path = region.path.clone();
    teardown.register("remove synthetic region", move || {
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "Failed to remove synthetic region");
        }
    });

    let producer = MockProducer::new(MockProducerConfig {
        width: region.max_roi,
        height: region.max_roi,
        ..Default::default()
    });
    let handle = producer.start(writer);
    teardown.register("stop synthetic producer", move || {
        producer.stop();
        if handle.join().is_err() {
            warn!("Synthetic producer thread panicked");
        }
    });

    info!(region = %region.path.display(), "Synthetic producer started");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then ask the loop to stop at the next boundary
async fn watch_shutdown_signal(stop: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, stopping control loop...");
    stop.store(true, Ordering::Relaxed);
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &TrackerBlueprint, tracker: &Tracker) {
    let params = tracker.controller().params();

    println!("\n=== Configuration Summary ===\n");
    println!("Region:");
    println!("  Path: {}", blueprint.region.path.display());
    println!(
        "  Max ROI: {} (mapping {} bytes)",
        blueprint.region.max_roi,
        blueprint.region.mapping_size()
    );
    println!("\nTransport:");
    println!("  Kind: {:?}", blueprint.transport.kind);
    println!("  Target: {}", blueprint.transport.endpoint());
    println!("\nControl:");
    println!("  Profile: {}", tracker.profile());
    println!("  Filter: {}", if params.filter_enabled { "on" } else { "off" });
    println!(
        "  Gain: base {} / cap {} / distance {}",
        params.base_gain, params.gain_cap, params.distance_gain
    );
    println!("  Prediction factor: {}", params.prediction_factor);
    println!("\nRuntime:");
    println!("  Poll interval: {} us", blueprint.runtime.poll_interval_us);
    println!(
        "  Diagnostics: {}",
        if blueprint.diagnostics.enabled {
            format!("every {} ms", blueprint.diagnostics.interval_ms)
        } else {
            "off".to_string()
        }
    );
    println!();
}
