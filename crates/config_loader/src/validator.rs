//! 配置校验模块
//!
//! 校验规则：
//! - 字段范围 (validator derive)
//! - 预设表非空，且每个预设 gain_cap >= base_gain
//! - 精确/粗略目标类别不同
//! - 目标地址非空

use contracts::{ContractError, TrackerBlueprint};
use ::validator::Validate;

/// 校验 TrackerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    validate_ranges(blueprint)?;
    validate_profiles(blueprint)?;
    validate_classes(blueprint)?;
    validate_transport(blueprint)?;
    Ok(())
}

/// 字段范围校验
fn validate_ranges(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "blueprint".to_string());
        ContractError::config_validation(field, errors.to_string())
    })
}

/// 校验增益预设表
fn validate_profiles(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let control = &blueprint.control;
    if control.profiles.is_empty() {
        return Err(ContractError::config_validation(
            "control.profiles",
            "at least one gain profile is required",
        ));
    }

    for (key, profile) in &control.profiles {
        profile.validate().map_err(|e| {
            ContractError::config_validation(format!("control.profiles.{key}"), e.to_string())
        })?;
        if profile.gain_cap < profile.base_gain {
            return Err(ContractError::config_validation(
                format!("control.profiles.{key}.gain_cap"),
                format!(
                    "gain_cap ({}) must be >= base_gain ({})",
                    profile.gain_cap, profile.base_gain
                ),
            ));
        }
    }
    Ok(())
}

/// 校验目标类别
fn validate_classes(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    let perception = &blueprint.perception;
    if perception.primary_class == perception.secondary_class {
        return Err(ContractError::config_validation(
            "perception.primary_class / perception.secondary_class",
            format!(
                "class ids must differ, both are {}",
                perception.primary_class
            ),
        ));
    }
    Ok(())
}

fn validate_transport(blueprint: &TrackerBlueprint) -> Result<(), ContractError> {
    if blueprint.transport.host.trim().is_empty() {
        return Err(ContractError::config_validation(
            "transport.host",
            "host cannot be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::GainProfile;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&TrackerBlueprint::default()).is_ok());
    }

    #[test]
    fn test_empty_profile_table() {
        let mut bp = TrackerBlueprint::default();
        bp.control.profiles.clear();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("control.profiles"));
    }

    #[test]
    fn test_cap_below_base() {
        let mut bp = TrackerBlueprint::default();
        bp.control.profiles.insert(
            "bad".into(),
            GainProfile {
                label: String::new(),
                filter_enabled: true,
                base_gain: 0.05,
                gain_cap: 0.01,
                target_offset: 0.3,
            },
        );
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("gain_cap"));
    }

    #[test]
    fn test_same_class_ids() {
        let mut bp = TrackerBlueprint::default();
        bp.perception.secondary_class = bp.perception.primary_class;
        assert!(matches!(
            validate(&bp),
            Err(ContractError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_tiny_roi_rejected() {
        let mut bp = TrackerBlueprint::default();
        bp.region.max_roi = 1;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_huge_roi_rejected() {
        let mut bp = TrackerBlueprint::default();
        bp.region.max_roi = 60_000;
        assert!(validate(&bp).is_err());
        bp.region.max_roi = 4096;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut bp = TrackerBlueprint::default();
        bp.runtime.poll_interval_us = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_empty_host_rejected() {
        let mut bp = TrackerBlueprint::default();
        bp.transport.host = " ".into();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("transport.host"));
    }
}
