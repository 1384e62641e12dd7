//! Tracker - selection + control for one loop

use contracts::{ContractError, Correction, Detection, TrackerBlueprint};
use tracing::{info, warn};

use crate::controller::{AimController, ControlParams};
use crate::selector::TargetSelector;

/// Detections in, correction out
#[derive(Debug, Clone)]
pub struct Tracker {
    profile: String,
    selector: TargetSelector,
    controller: AimController,
}

impl Tracker {
    pub fn new(
        profile: impl Into<String>,
        selector: TargetSelector,
        params: ControlParams,
    ) -> Self {
        Self {
            profile: profile.into(),
            selector,
            controller: AimController::new(params),
        }
    }

    /// Build from configuration, resolving the selected gain profile
    ///
    /// An unknown profile falls back to the default one with a warning.
    pub fn from_blueprint(blueprint: &TrackerBlueprint) -> Result<Self, ContractError> {
        let control = &blueprint.control;
        let (key, profile, fell_back) = control.resolve_profile().ok_or_else(|| {
            ContractError::config_validation("control.profiles", "no gain profile configured")
        })?;
        if fell_back {
            warn!(requested = %control.profile, using = key, "unknown gain profile, falling back");
        }

        let params = ControlParams::from_config(control, profile);
        info!(
            profile = key,
            label = %profile.label,
            filter = params.filter_enabled,
            base_gain = params.base_gain,
            gain_cap = params.gain_cap,
            target_offset = profile.target_offset,
            "tracker configured"
        );

        let perception = &blueprint.perception;
        let selector = TargetSelector::new(
            perception.primary_class,
            perception.secondary_class,
            profile.target_offset,
        );
        Ok(Self::new(key, selector, params))
    }

    /// Key of the gain profile in use
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn controller(&self) -> &AimController {
        &self.controller
    }

    pub fn step(&mut self, detections: &[Detection], width: u32, height: u32) -> Correction {
        let point = self.selector.select(detections);
        self.controller.compute(point, width, height)
    }

    pub fn reset(&mut self) {
        self.controller.reset();
    }
}
