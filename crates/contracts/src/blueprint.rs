//! SystemBlueprint - Config Loader 输出
//!
//! 描述完整的系统配置：数据源、同步策略、标定、融合、跟踪、规则、区域、输出路由。
//! 所有数值阈值都是配置，不是常量。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{Axis, Zone};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的系统配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SystemBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 相机与数据源
    #[validate(nested)]
    pub system: SystemConfig,

    /// 同步策略
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,

    /// 标定参数 (缺失时仅 2D 运行)
    #[serde(default)]
    pub calibration: Option<CalibrationConfig>,

    #[serde(default)]
    #[validate(nested)]
    pub fusion: FusionConfig,

    #[serde(default)]
    #[validate(nested)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    #[validate(nested)]
    pub pipeline: PipelineConfig,

    /// 区域定义列表
    #[serde(default)]
    pub zones: Vec<Zone>,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SystemConfig {
    /// 事件中的 camera_id
    #[validate(length(min = 1))]
    pub camera_id: String,

    /// 2D 视频源 ID
    #[validate(length(min = 1))]
    pub video_source_id: String,

    /// 3D 深度源 ID
    #[validate(length(min = 1))]
    pub depth_source_id: String,

    /// 2D 采样频率 (Hz)，用于模拟源
    #[serde(default = "default_video_fps")]
    #[validate(range(exclusive_min = 0.0))]
    pub video_fps: f64,

    /// 3D 采样频率 (Hz)，用于模拟源
    #[serde(default = "default_depth_fps")]
    #[validate(range(exclusive_min = 0.0))]
    pub depth_fps: f64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            camera_id: "cam-01".into(),
            video_source_id: "video-01".into(),
            depth_source_id: "depth-01".into(),
            video_fps: default_video_fps(),
            depth_fps: default_depth_fps(),
        }
    }
}

fn default_video_fps() -> f64 {
    15.0
}

fn default_depth_fps() -> f64 {
    30.0
}

/// 同步策略配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyncConfig {
    /// 同步容差 (毫秒)
    #[validate(range(exclusive_min = 0.0))]
    pub tolerance_ms: f64,

    /// 每个源的缓冲容量
    #[validate(range(min = 1))]
    pub buffer_capacity: usize,

    /// 深度不可用时降级为仅 2D
    pub video_only_fallback: bool,

    /// 多久没有深度帧视为不可用 (秒)
    #[validate(range(exclusive_min = 0.0))]
    pub depth_unavailable_after_sec: f64,
}

impl SyncConfig {
    pub fn tolerance_sec(&self) -> f64 {
        self.tolerance_ms / 1000.0
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 100.0,
            buffer_capacity: 60,
            video_only_fallback: true,
            depth_unavailable_after_sec: 1.0,
        }
    }
}

/// 标定参数：单应矩阵 + 深度相机内参 + 畸变 + 外参
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// 2D 像素 -> 深度相机像素
    #[serde(default = "identity3")]
    pub homography: [[f64; 3]; 3],

    /// 深度相机内参
    pub intrinsics: Intrinsics,

    /// k1, k2, p1, p2, k3
    #[serde(default)]
    pub distortion: [f64; 5],

    /// 深度相机 -> 世界 旋转
    #[serde(default = "identity3")]
    pub rotation: [[f64; 3]; 3],

    /// 深度相机 -> 世界 平移 (米)
    #[serde(default)]
    pub translation: [f64; 3],
}

fn identity3() -> [[f64; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

/// 针孔相机内参 (像素)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// 检测框上的深度采样点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FootprintAnchor {
    Center,
    #[default]
    BottomCenter,
}

/// 融合配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FusionConfig {
    pub footprint: FootprintAnchor,

    /// 采样邻域半径 (像素)，取中值
    #[validate(range(max = 32))]
    pub sample_radius_px: u32,

    #[validate(range(min = 0.0))]
    pub min_depth_m: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub max_depth_m: f64,

    /// 跨模态匹配的最大距离 (米)
    #[validate(range(exclusive_min = 0.0))]
    pub max_match_distance_m: f64,

    /// 无有效深度时的投影有效度
    #[validate(range(min = 0.0, max = 1.0))]
    pub degraded_validity: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            footprint: FootprintAnchor::BottomCenter,
            sample_radius_px: 2,
            min_depth_m: 0.3,
            max_depth_m: 10.0,
            max_match_distance_m: 1.0,
            degraded_validity: 0.5,
        }
    }
}

/// 跟踪配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrackerConfig {
    /// 允许的最大移动速度 (m/s)，用于关联门限
    #[validate(range(exclusive_min = 0.0))]
    pub max_speed_ms: f64,

    /// 门限下限 (米)
    #[validate(range(min = 0.0))]
    pub min_gate_m: f64,

    /// NEW -> ACTIVE 所需连续匹配次数
    #[validate(range(min = 1))]
    pub activation_matches: u32,

    /// 丢失超时 (秒)
    #[validate(range(exclusive_min = 0.0))]
    pub lost_timeout_sec: f64,

    /// 静止判定距离 (米)
    #[validate(range(min = 0.0))]
    pub idle_threshold_m: f64,

    /// 静止判定时长 (秒)
    #[validate(range(exclusive_min = 0.0))]
    pub idle_duration_sec: f64,

    /// 轨迹历史容量
    #[validate(range(min = 2))]
    pub history_capacity: usize,

    /// 运动学滑动窗口 (秒)
    #[validate(range(exclusive_min = 0.0))]
    pub kinematics_window_sec: f64,

    /// 仅 2D 观测的 IoU 关联门限
    #[validate(range(min = 0.0, max = 1.0))]
    pub image_gate_iou: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_speed_ms: 5.0,
            min_gate_m: 0.5,
            activation_matches: 2,
            lost_timeout_sec: 5.0,
            idle_threshold_m: 0.1,
            idle_duration_sec: 10.0,
            history_capacity: 100,
            kinematics_window_sec: 1.0,
            image_gate_iou: 0.3,
        }
    }
}

/// 规则配置；阈值检查由 config_loader 负责
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// 同一 (对象, 事件类型) 的冷却窗口 (秒)
    pub cooldown_sec: f64,
    /// 低于该置信度的事件被丢弃
    pub min_confidence: f64,
    pub zone: ZoneRuleConfig,
    pub idle: ToggleRule,
    pub fall: FallRuleConfig,
    pub distance: DistanceRuleConfig,
    pub speed: SpeedRuleConfig,
    pub new_object: ToggleRule,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            cooldown_sec: 1.0,
            min_confidence: 0.0,
            zone: ZoneRuleConfig::default(),
            idle: ToggleRule::default(),
            fall: FallRuleConfig::default(),
            distance: DistanceRuleConfig::default(),
            speed: SpeedRuleConfig::default(),
            new_object: ToggleRule::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleRule {
    pub enabled: bool,
}

impl Default for ToggleRule {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneRuleConfig {
    pub enabled: bool,
    /// 迟滞：连续 N 次一致才确认成员关系变化
    pub confirmations: u32,
}

impl Default for ZoneRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confirmations: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallRuleConfig {
    pub enabled: bool,
    /// 躯干与水平面夹角低于此值视为倒地姿态 (度)
    pub body_angle_deg: f64,
    /// 高度下降阈值 (米)
    pub height_drop_m: f64,
    /// 高度下降的观察窗口 (秒)
    pub window_sec: f64,
    /// 竖直方向所在的世界轴
    pub vertical_axis: Axis,
}

impl Default for FallRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            body_angle_deg: 45.0,
            height_drop_m: 0.5,
            window_sec: 1.0,
            vertical_axis: Axis::Z,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceRuleConfig {
    pub enabled: bool,
    pub threshold_m: f64,
}

impl Default for DistanceRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_m: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedRuleConfig {
    pub enabled: bool,
    pub threshold_ms: f64,
}

impl Default for SpeedRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_ms: 2.0,
        }
    }
}

/// 流水线消费者配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    /// 消费者轮询间隔上限 (毫秒)
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    /// 关闭时等待 sink 排空的超时 (毫秒)
    pub shutdown_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 20,
            shutdown_timeout_ms: 2000,
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量 (满时丢弃最旧事件)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// JSON Lines 文件 (持久化)
    File,
    /// UDP 广播 (实时推送)
    Network,
}

impl SystemBlueprint {
    /// Zones that survive loading and are switched on
    pub fn enabled_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let bp = SystemBlueprint::default();
        assert_eq!(bp.sync.buffer_capacity, 60);
        assert!((bp.sync.tolerance_sec() - 0.1).abs() < 1e-12);
        assert_eq!(bp.tracker.activation_matches, 2);
        assert_eq!(bp.tracker.lost_timeout_sec, 5.0);
        assert_eq!(bp.rules.speed.threshold_ms, 2.0);
        assert_eq!(bp.rules.distance.threshold_m, 0.5);
        assert_eq!(bp.rules.zone.confirmations, 2);
        assert!(bp.calibration.is_none());
    }

    #[test]
    fn test_field_validation() {
        let mut bp = SystemBlueprint::default();
        assert!(bp.validate().is_ok());

        bp.sync.tolerance_ms = 0.0;
        assert!(bp.validate().is_err());

        bp.sync.tolerance_ms = 100.0;
        bp.tracker.activation_matches = 0;
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_sections_are_optional_in_json() {
        let bp: SystemBlueprint = serde_json::from_str(
            r#"{"system":{"camera_id":"c","video_source_id":"v","depth_source_id":"d"}}"#,
        )
        .unwrap();
        assert_eq!(bp.system.video_fps, 15.0);
        assert_eq!(bp.fusion.footprint, FootprintAnchor::BottomCenter);
        assert!(bp.zones.is_empty());
    }
}
