//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。缺省的段落使用默认值。

use contracts::{ContractError, TrackerBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<TrackerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<TrackerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<TrackerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TransportKind;

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let bp = parse_toml("").unwrap();
        assert_eq!(bp.region.max_roi, 256);
        assert_eq!(bp.transport.port, 12345);
        assert_eq!(bp.control.profile, "A");
    }

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[region]
path = "/tmp/frames"
max_roi = 128

[transport]
kind = "log"

[control]
profile = "C"
prediction_factor = 2.0

[perception]
confidence = 0.6
fallback_asset = "portable.json"
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.region.path.to_str(), Some("/tmp/frames"));
        assert_eq!(bp.region.max_roi, 128);
        assert_eq!(bp.transport.kind, TransportKind::Log);
        assert_eq!(bp.transport.host, "127.0.0.1");
        assert_eq!(bp.control.profile, "C");
        assert_eq!(bp.control.prediction_factor, 2.0);
        assert_eq!(bp.control.profiles.len(), 3);
        assert!(bp.perception.fallback_asset.is_some());
    }

    #[test]
    fn test_parse_toml_custom_profile_table() {
        let content = r#"
[control]
profile = "fast"

[control.profiles.fast]
base_gain = 0.03
gain_cap = 0.08
"#;
        let bp = parse_toml(content).unwrap();
        let fast = &bp.control.profiles["fast"];
        assert!(fast.filter_enabled);
        assert_eq!(fast.target_offset, 0.0);
        assert_eq!(bp.control.profiles.len(), 1);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "transport": { "host": "10.0.0.2", "port": 9000 },
            "diagnostics": { "enabled": true }
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.transport.endpoint(), "10.0.0.2:9000");
        assert!(bp.diagnostics.enabled);
        assert_eq!(bp.diagnostics.interval_ms, 1000);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_rejects_unknown_transport_kind() {
        let result = parse_toml("[transport]\nkind = \"serial\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
