//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_loop;
pub use validate::run_validate;

use std::path::Path;

use contracts::TrackerBlueprint;
use tracing::info;
use trackloop_cli::CliError;

/// Load the blueprint from `path`, or defaults when no path is given
fn load_blueprint(path: Option<&Path>) -> Result<TrackerBlueprint, CliError> {
    match path {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            Ok(config_loader::ConfigLoader::load_from_path(path)?)
        }
        None => {
            info!("No configuration file given, using defaults");
            Ok(TrackerBlueprint::default())
        }
    }
}
