//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{TrackerBlueprint, TransportKind};
use serde::Serialize;
use tracing::info;
use trackloop_cli::perception::resolve_asset;
use trackloop_cli::Outcome;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    region: String,
    mapping_size: usize,
    target: String,
    profile: String,
    profile_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<Outcome> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(Outcome::Completed)
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let profile = blueprint
                .control
                .resolve_profile()
                .map(|(key, _, _)| key.to_string())
                .unwrap_or_default();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    region: blueprint.region.path.display().to_string(),
                    mapping_size: blueprint.region.mapping_size(),
                    target: blueprint.transport.endpoint(),
                    profile,
                    profile_count: blueprint.control.profiles.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &TrackerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some((key, _, true)) = blueprint.control.resolve_profile() {
        warnings.push(format!(
            "Profile '{}' not found - falling back to '{}'",
            blueprint.control.profile, key
        ));
    }

    if resolve_asset(&blueprint.perception).is_err() {
        warnings.push(format!(
            "Perception asset '{}' not usable - `run` will fail at startup",
            blueprint.perception.asset.display()
        ));
    }

    if blueprint.transport.kind == TransportKind::Log {
        warnings.push("transport.kind is 'log' - corrections are only logged".to_string());
    }

    if !blueprint.region.path.exists() {
        warnings.push(format!(
            "Region '{}' does not exist yet - the loop will wait for a producer",
            blueprint.region.path.display()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("OK  Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Region: {} ({} bytes)", summary.region, summary.mapping_size);
            println!("  Target: {}", summary.target);
            println!(
                "  Profile: {} (of {})",
                summary.profile, summary.profile_count
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\nWarnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("ERR Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_warnings_for_unknown_profile_and_missing_asset() {
        let mut bp = TrackerBlueprint::default();
        bp.control.profile = "Z".into();
        bp.perception.asset = "/nonexistent/markers.json".into();
        bp.transport.kind = TransportKind::Log;

        let warnings = collect_warnings(&bp);
        assert!(warnings.iter().any(|w| w.contains("falling back to 'A'")));
        assert!(warnings.iter().any(|w| w.contains("not usable")));
        assert!(warnings.iter().any(|w| w.contains("only logged")));
    }

    #[test]
    fn test_validate_reports_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[transport]\nport = 0\n").unwrap();

        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/trackloop.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
