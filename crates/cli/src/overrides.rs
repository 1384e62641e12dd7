//! Command-line overrides applied on top of the loaded configuration.

use std::path::PathBuf;

use contracts::TrackerBlueprint;
use tracing::info;

use crate::error::{CliError, Result};

/// Values given on the command line (or via env) that win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub region: Option<PathBuf>,
    /// `host:port`
    pub target: Option<String>,
    pub profile: Option<String>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        self.region.is_none() && self.target.is_none() && self.profile.is_none()
    }

    /// Apply onto `blueprint`, then re-validate it
    pub fn apply(&self, blueprint: &mut TrackerBlueprint) -> Result<()> {
        if let Some(ref region) = self.region {
            info!(region = %region.display(), "Overriding region path from CLI");
            blueprint.region.path = region.clone();
        }
        if let Some(ref target) = self.target {
            let (host, port) = parse_target(target)?;
            info!(host = %host, port, "Overriding transport target from CLI");
            blueprint.transport.host = host;
            blueprint.transport.port = port;
        }
        if let Some(ref profile) = self.profile {
            info!(profile = %profile, "Overriding gain profile from CLI");
            blueprint.control.profile = profile.clone();
        }

        if !self.is_empty() {
            config_loader::ConfigLoader::validate(blueprint)?;
        }
        Ok(())
    }
}

/// Split `host:port`; the last colon separates the port
pub fn parse_target(target: &str) -> Result<(String, u16)> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| CliError::invalid_argument("--target", "expected host:port"))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(CliError::invalid_argument("--target", "host is empty"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| CliError::invalid_argument("--target", format!("bad port '{port}': {e}")))?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("10.0.0.2:4000").unwrap(),
            ("10.0.0.2".to_string(), 4000)
        );
        assert_eq!(parse_target("[::1]:9").unwrap(), ("::1".to_string(), 9));
        assert!(parse_target("localhost").is_err());
        assert!(parse_target(":80").is_err());
        assert!(parse_target("host:99999").is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut bp = TrackerBlueprint::default();
        let overrides = Overrides {
            region: Some(PathBuf::from("/tmp/region")),
            target: Some("192.168.1.5:7000".into()),
            profile: Some("c".into()),
        };
        overrides.apply(&mut bp).unwrap();
        assert_eq!(bp.region.path, PathBuf::from("/tmp/region"));
        assert_eq!(bp.transport.endpoint(), "192.168.1.5:7000");
        assert_eq!(bp.control.profile, "c");
    }

    #[test]
    fn test_port_zero_fails_validation() {
        let mut bp = TrackerBlueprint::default();
        let overrides = Overrides {
            target: Some("127.0.0.1:0".into()),
            ..Default::default()
        };
        assert!(matches!(
            overrides.apply(&mut bp),
            Err(CliError::Startup(_))
        ));
    }
}
