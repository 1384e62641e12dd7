//! Built-in perception: a color-marker detector described by a JSON asset,
//! plus the post-filter every adapter's output goes through.

mod asset;
mod filter;
mod marker;

pub use asset::{load_asset, resolve_asset, MarkerAsset, MarkerSpec};
pub use filter::{Filtered, PostFilter};
pub use marker::MarkerDetector;

use contracts::PerceptionConfig;
use tracing::info;

/// Resolve the asset and build the filtered detector
pub fn build_detector(
    config: &PerceptionConfig,
) -> Result<Filtered<MarkerDetector>, contracts::ContractError> {
    let (path, asset) = resolve_asset(config)?;
    info!(
        asset = %path.display(),
        name = %asset.name,
        markers = asset.markers.len(),
        "perception asset loaded"
    );
    Ok(Filtered::new(
        MarkerDetector::new(asset),
        PostFilter::from_config(config),
    ))
}
