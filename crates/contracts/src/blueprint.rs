//! TrackerBlueprint - Config Loader output
//!
//! 描述完整的运行配置：共享内存区域、输出通道、控制参数、感知参数、诊断开关。
//! 所有字段在循环启动时读取一次，运行期间只读。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::{max_payload_for_roi, mapping_size_for_roi, DEFAULT_MAX_ROI};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TrackerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 共享内存帧通道
    #[serde(default)]
    #[validate(nested)]
    pub region: RegionConfig,

    /// 修正量输出通道
    #[serde(default)]
    #[validate(nested)]
    pub transport: TransportConfig,

    /// 控制器参数
    #[serde(default)]
    #[validate(nested)]
    pub control: ControlConfig,

    /// 感知参数
    #[serde(default)]
    #[validate(nested)]
    pub perception: PerceptionConfig,

    /// 主循环参数
    #[serde(default)]
    #[validate(nested)]
    pub runtime: RuntimeConfig,

    /// 性能诊断
    #[serde(default)]
    #[validate(nested)]
    pub diagnostics: DiagnosticsConfig,
}

/// 共享内存区域配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegionConfig {
    /// 区域标识 (Linux 下为 /dev/shm 中的文件路径)
    #[serde(default = "default_region_path")]
    pub path: PathBuf,

    /// ROI 边长上限 (像素)，决定最大载荷与映射大小
    #[serde(default = "default_max_roi")]
    #[validate(range(min = 2, max = 4096))]
    pub max_roi: u16,
}

impl RegionConfig {
    /// Maximum accepted payload (BGR24, square ROI)
    pub fn max_payload(&self) -> usize {
        max_payload_for_roi(self.max_roi)
    }

    /// Total mapping size (header + max payload)
    pub fn mapping_size(&self) -> usize {
        mapping_size_for_roi(self.max_roi)
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            path: default_region_path(),
            max_roi: default_max_roi(),
        }
    }
}

fn default_region_path() -> PathBuf {
    PathBuf::from("/dev/shm/scrcpy_ai_vision")
}

fn default_max_roi() -> u16 {
    DEFAULT_MAX_ROI
}

/// 输出通道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// UDP 数据报
    #[default]
    Udp,
    /// 仅记录日志 (调试用)
    Log,
}

/// 输出通道配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransportConfig {
    /// 通道类型
    #[serde(default)]
    pub kind: TransportKind,

    /// 目标主机
    #[serde(default = "default_transport_host")]
    pub host: String,

    /// 目标端口
    #[serde(default = "default_transport_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// 发送失败日志的最小间隔 (毫秒)
    #[serde(default = "default_error_log_interval_ms")]
    pub error_log_interval_ms: u64,
}

impl TransportConfig {
    /// `host:port` endpoint string
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn error_log_interval(&self) -> Duration {
        Duration::from_millis(self.error_log_interval_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            host: default_transport_host(),
            port: default_transport_port(),
            error_log_interval_ms: default_error_log_interval_ms(),
        }
    }
}

fn default_transport_host() -> String {
    "127.0.0.1".to_string()
}

fn default_transport_port() -> u16 {
    12345
}

fn default_error_log_interval_ms() -> u64 {
    1000
}

/// 增益预设
///
/// 各预设的常数彼此独立，视为不透明配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GainProfile {
    /// 预设说明
    #[serde(default)]
    pub label: String,

    /// 是否启用卡尔曼滤波
    #[serde(default = "default_true")]
    pub filter_enabled: bool,

    /// 基础增益
    #[validate(range(min = 0.0))]
    pub base_gain: f64,

    /// 增益上限
    #[validate(range(min = 0.0))]
    pub gain_cap: f64,

    /// 次级目标的上移比例 (相对检测框高度)
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub target_offset: f64,
}

fn default_true() -> bool {
    true
}

/// 默认预设 A/B/C
pub fn default_gain_profiles() -> BTreeMap<String, GainProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        "A".to_string(),
        GainProfile {
            label: "stable".to_string(),
            filter_enabled: true,
            base_gain: 0.015,
            gain_cap: 0.05,
            target_offset: 0.50,
        },
    );
    profiles.insert(
        "B".to_string(),
        GainProfile {
            label: "follow".to_string(),
            filter_enabled: true,
            base_gain: 0.015,
            gain_cap: 0.030,
            target_offset: 0.26,
        },
    );
    profiles.insert(
        "C".to_string(),
        GainProfile {
            label: "no_filter".to_string(),
            filter_enabled: false,
            base_gain: 0.02,
            gain_cap: 0.06,
            target_offset: 0.34,
        },
    );
    profiles
}

/// Profile key used when the selection is unknown
pub const FALLBACK_PROFILE: &str = "A";

/// 控制器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ControlConfig {
    /// 选中的预设
    #[serde(default = "default_profile")]
    pub profile: String,

    /// 距离→增益系数
    #[serde(default = "default_distance_gain")]
    #[validate(range(min = 0.0))]
    pub distance_gain: f64,

    /// 预测时域系数 (速度外推倍数)
    #[serde(default = "default_prediction_factor")]
    #[validate(range(min = 0.0))]
    pub prediction_factor: f64,

    /// 预设表
    #[serde(default = "default_gain_profiles")]
    pub profiles: BTreeMap<String, GainProfile>,
}

impl ControlConfig {
    /// Resolve the selected profile, falling back to [`FALLBACK_PROFILE`]
    ///
    /// Returns the key actually used and whether a fallback happened.
    pub fn resolve_profile(&self) -> Option<(&str, &GainProfile, bool)> {
        let wanted = self.profile.to_uppercase();
        if let Some((key, profile)) = self
            .profiles
            .iter()
            .find(|(key, _)| key.to_uppercase() == wanted)
        {
            return Some((key.as_str(), profile, false));
        }
        self.profiles
            .get_key_value(FALLBACK_PROFILE)
            .or_else(|| self.profiles.iter().next())
            .map(|(key, profile)| (key.as_str(), profile, true))
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            distance_gain: default_distance_gain(),
            prediction_factor: default_prediction_factor(),
            profiles: default_gain_profiles(),
        }
    }
}

fn default_profile() -> String {
    FALLBACK_PROFILE.to_string()
}

fn default_distance_gain() -> f64 {
    0.001
}

fn default_prediction_factor() -> f64 {
    4.0
}

/// 感知配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PerceptionConfig {
    /// 精确目标类别 (优先)
    #[serde(default = "default_primary_class")]
    pub primary_class: u32,

    /// 粗略目标类别
    #[serde(default = "default_secondary_class")]
    pub secondary_class: u32,

    /// 置信度阈值
    #[serde(default = "default_confidence")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f32,

    /// 单帧最大检测数
    #[serde(default = "default_max_detections")]
    #[validate(range(min = 1))]
    pub max_detections: usize,

    /// 首选模型资源
    #[serde(default = "default_asset")]
    pub asset: PathBuf,

    /// 备用模型资源 (首选缺失或加载失败时使用)
    #[serde(default)]
    pub fallback_asset: Option<PathBuf>,
}

impl PerceptionConfig {
    /// Class ids the detector should report
    pub fn classes(&self) -> [u32; 2] {
        [self.secondary_class, self.primary_class]
    }
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            primary_class: default_primary_class(),
            secondary_class: default_secondary_class(),
            confidence: default_confidence(),
            max_detections: default_max_detections(),
            asset: default_asset(),
            fallback_asset: None,
        }
    }
}

fn default_primary_class() -> u32 {
    1
}

fn default_secondary_class() -> u32 {
    0
}

fn default_confidence() -> f32 {
    0.45
}

fn default_max_detections() -> usize {
    10
}

fn default_asset() -> PathBuf {
    PathBuf::from("markers.json")
}

/// 主循环配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuntimeConfig {
    /// 无新帧时的休眠间隔 (微秒)
    #[serde(default = "default_poll_interval_us")]
    #[validate(range(min = 1))]
    pub poll_interval_us: u64,
}

impl RuntimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: default_poll_interval_us(),
        }
    }
}

fn default_poll_interval_us() -> u64 {
    1000
}

/// 诊断配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiagnosticsConfig {
    /// 是否启用性能统计
    #[serde(default)]
    pub enabled: bool,

    /// 汇总输出间隔 (毫秒)
    #[serde(default = "default_report_interval_ms")]
    #[validate(range(min = 1))]
    pub interval_ms: u64,
}

impl DiagnosticsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_report_interval_ms(),
        }
    }
}

fn default_report_interval_ms() -> u64 {
    1000
}
