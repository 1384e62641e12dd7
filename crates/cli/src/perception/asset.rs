//! Marker asset: which color blob maps to which class id.
//!
//! ```json
//! {
//!   "name": "figure-markers",
//!   "markers": [
//!     { "class_id": 1, "label": "head", "color": [40, 40, 220], "tolerance": 24 }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use contracts::{ContractError, PerceptionConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerAsset {
    #[serde(default = "default_asset_name")]
    pub name: String,
    pub markers: Vec<MarkerSpec>,
}

/// One class: pixels within `tolerance` of `color` (per channel, BGR)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub class_id: u32,
    #[serde(default)]
    pub label: String,
    pub color: [u8; 3],
    #[serde(default = "default_tolerance")]
    pub tolerance: u8,
    /// Fewer matching pixels than this is treated as noise
    #[serde(default = "default_min_pixels")]
    pub min_pixels: usize,
}

impl MarkerSpec {
    #[inline]
    pub fn matches(&self, bgr: &[u8]) -> bool {
        self.color
            .iter()
            .zip(bgr)
            .all(|(want, got)| want.abs_diff(*got) <= self.tolerance)
    }
}

fn default_asset_name() -> String {
    "markers".to_string()
}

fn default_tolerance() -> u8 {
    24
}

fn default_min_pixels() -> usize {
    4
}

/// Load and parse one asset file
pub fn load_asset(path: &Path) -> Result<MarkerAsset, ContractError> {
    let content = std::fs::read_to_string(path)?;
    let asset: MarkerAsset = serde_json::from_str(&content).map_err(|e| {
        ContractError::perception(format!("invalid asset {}: {e}", path.display()))
    })?;
    if asset.markers.is_empty() {
        return Err(ContractError::perception(format!(
            "asset {} defines no markers",
            path.display()
        )));
    }
    Ok(asset)
}

/// Preferred asset first, then the fallback; neither usable is fatal
pub fn resolve_asset(config: &PerceptionConfig) -> Result<(PathBuf, MarkerAsset), ContractError> {
    let candidates = std::iter::once(&config.asset).chain(config.fallback_asset.as_ref());

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_asset(path) {
            Ok(asset) => return Ok((path.clone(), asset)),
            Err(e) => warn!(asset = %path.display(), error = %e, "asset unusable, trying fallback"),
        }
    }

    Err(ContractError::AssetMissing {
        path: config.asset.display().to_string(),
    })
}
