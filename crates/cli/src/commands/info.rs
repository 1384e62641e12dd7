//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::TrackerBlueprint;
use serde::Serialize;
use tracing::info;
use trackloop_cli::Outcome;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    region: RegionInfo,
    transport: TransportInfo,
    control: ControlInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    profiles: Vec<ProfileInfo>,
    perception: PerceptionInfo,
}

#[derive(Serialize)]
struct RegionInfo {
    path: String,
    max_roi: u16,
    max_payload: usize,
    mapping_size: usize,
}

#[derive(Serialize)]
struct TransportInfo {
    kind: String,
    endpoint: String,
    error_log_interval_ms: u64,
}

#[derive(Serialize)]
struct ControlInfo {
    requested_profile: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_profile: Option<String>,
    distance_gain: f64,
    prediction_factor: f64,
}

#[derive(Serialize)]
struct ProfileInfo {
    key: String,
    label: String,
    filter_enabled: bool,
    base_gain: f64,
    gain_cap: f64,
    target_offset: f64,
}

#[derive(Serialize)]
struct PerceptionInfo {
    primary_class: u32,
    secondary_class: u32,
    confidence: f32,
    max_detections: usize,
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_asset: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<Outcome> {
    info!("Loading configuration info");

    let blueprint = load_blueprint(args.config.as_deref()).context("Failed to load config")?;
    let info = build_config_info(&blueprint, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(Outcome::Completed)
}

fn build_config_info(blueprint: &TrackerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let control = &blueprint.control;

    let profiles = if args.profiles {
        control
            .profiles
            .iter()
            .map(|(key, p)| ProfileInfo {
                key: key.clone(),
                label: p.label.clone(),
                filter_enabled: p.filter_enabled,
                base_gain: p.base_gain,
                gain_cap: p.gain_cap,
                target_offset: p.target_offset,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        region: RegionInfo {
            path: blueprint.region.path.display().to_string(),
            max_roi: blueprint.region.max_roi,
            max_payload: blueprint.region.max_payload(),
            mapping_size: blueprint.region.mapping_size(),
        },
        transport: TransportInfo {
            kind: format!("{:?}", blueprint.transport.kind),
            endpoint: blueprint.transport.endpoint(),
            error_log_interval_ms: blueprint.transport.error_log_interval_ms,
        },
        control: ControlInfo {
            requested_profile: control.profile.clone(),
            active_profile: control
                .resolve_profile()
                .map(|(key, p, _)| format!("{key} ({})", p.label)),
            distance_gain: control.distance_gain,
            prediction_factor: control.prediction_factor,
        },
        profiles,
        perception: PerceptionInfo {
            primary_class: blueprint.perception.primary_class,
            secondary_class: blueprint.perception.secondary_class,
            confidence: blueprint.perception.confidence,
            max_detections: blueprint.perception.max_detections,
            asset: blueprint.perception.asset.display().to_string(),
            fallback_asset: blueprint
                .perception
                .fallback_asset
                .as_ref()
                .map(|p| p.display().to_string()),
        },
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== trackloop configuration ({}) ===\n", info.version);

    println!("Region");
    println!("   |- Path: {}", info.region.path);
    println!("   |- Max ROI: {}", info.region.max_roi);
    println!("   `- Mapping: {} bytes", info.region.mapping_size);

    println!("\nTransport");
    println!("   |- Kind: {}", info.transport.kind);
    println!("   `- Target: {}", info.transport.endpoint);

    println!("\nControl");
    println!("   |- Profile: {}", info.control.requested_profile);
    if let Some(ref active) = info.control.active_profile {
        println!("   |- Active: {}", active);
    }
    println!("   |- Distance gain: {}", info.control.distance_gain);
    println!("   `- Prediction factor: {}", info.control.prediction_factor);

    if !info.profiles.is_empty() {
        println!("\nProfiles ({})", info.profiles.len());
        for (i, p) in info.profiles.iter().enumerate() {
            let prefix = if i == info.profiles.len() - 1 { "`-" } else { "|-" };
            println!(
                "   {} {} {:<10} filter={:<5} base={} cap={} offset={}",
                prefix,
                p.key,
                p.label,
                p.filter_enabled,
                p.base_gain,
                p.gain_cap,
                p.target_offset
            );
        }
    }

    println!("\nPerception");
    println!(
        "   |- Classes: primary {} / secondary {}",
        info.perception.primary_class, info.perception.secondary_class
    );
    println!(
        "   |- conf >= {}, max {} detections",
        info.perception.confidence, info.perception.max_detections
    );
    match info.perception.fallback_asset {
        Some(ref fallback) => {
            println!("   |- Asset: {}", info.perception.asset);
            println!("   `- Fallback: {}", fallback);
        }
        None => println!("   `- Asset: {}", info.perception.asset),
    }

    println!();
}
