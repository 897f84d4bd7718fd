//! 配置校验模块
//!
//! 致命错误 (加载失败)：
//! - 字段级范围检查 (`validator` derive)
//! - 2D / 3D 源 ID 相同
//! - zone_id 重复或为空
//! - sink 名称重复或为空，队列容量为 0
//! - 规则阈值为负，冷却时间为负，min_confidence 不在 [0, 1]
//! - 标定内参非法
//!
//! 警告 (继续运行)：
//! - 几何非法的区域被禁用
//! - 缺少标定，仅 2D 运行
//! - 没有配置 sink

use std::collections::HashSet;

use contracts::{CalibrationConfig, ContractError, RulesConfig, SystemBlueprint};
use serde::Serialize;
use tracing::warn;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 非致命的配置问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 校验 SystemBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SystemBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_sources(blueprint)?;
    validate_fusion(blueprint)?;
    validate_calibration(blueprint.calibration.as_ref())?;
    validate_rules(&blueprint.rules)?;
    validate_zone_ids(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 禁用非法区域并收集警告
pub fn sanitize(blueprint: &mut SystemBlueprint) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    for (idx, zone) in blueprint.zones.iter_mut().enumerate() {
        if !zone.enabled {
            continue;
        }
        if let Err(reason) = zone.geometry.check() {
            warn!(zone_id = %zone.zone_id, %reason, "Zone disabled: malformed geometry");
            zone.enabled = false;
            warnings.push(ConfigWarning::new(
                format!("zones[{idx}].geometry"),
                format!("zone '{}' disabled: {reason}", zone.zone_id),
            ));
        }
        if !(1..=10).contains(&zone.priority) {
            let clamped = zone.priority.clamp(1, 10);
            warnings.push(ConfigWarning::new(
                format!("zones[{idx}].priority"),
                format!("priority {} clamped to {clamped}", zone.priority),
            ));
            zone.priority = clamped;
        }
    }

    if blueprint.calibration.is_none() {
        warn!("No calibration configured, running 2D-only");
        warnings.push(ConfigWarning::new(
            "calibration",
            "missing calibration; observations carry no 3D position",
        ));
    }

    if blueprint.sinks.is_empty() {
        warnings.push(ConfigWarning::new(
            "sinks",
            "no sinks configured; events are discarded",
        ));
    }

    warnings
}

/// `validator` derive 检查，报告第一个违规字段
fn validate_fields(blueprint: &SystemBlueprint) -> Result<(), ContractError> {
    match blueprint.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("blueprint".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in entries {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|err| {
                let message = match (&err.message, err.params.get("value")) {
                    (Some(message), _) => message.to_string(),
                    (None, Some(value)) => format!("failed '{}' check (got {value})", err.code),
                    (None, None) => format!("failed '{}' check", err.code),
                };
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_violation(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_violation(inner, &format!("{path}[{idx}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn validate_sources(blueprint: &SystemBlueprint) -> Result<(), ContractError> {
    let system = &blueprint.system;
    if system.video_source_id == system.depth_source_id {
        return Err(ContractError::config_validation(
            "system.depth_source_id",
            format!(
                "video and depth sources must differ, both are '{}'",
                system.video_source_id
            ),
        ));
    }
    Ok(())
}

fn validate_fusion(blueprint: &SystemBlueprint) -> Result<(), ContractError> {
    let fusion = &blueprint.fusion;
    if fusion.min_depth_m >= fusion.max_depth_m {
        return Err(ContractError::config_validation(
            "fusion.min_depth_m / fusion.max_depth_m",
            format!(
                "min_depth_m ({}) must be < max_depth_m ({})",
                fusion.min_depth_m, fusion.max_depth_m
            ),
        ));
    }
    Ok(())
}

fn validate_calibration(calibration: Option<&CalibrationConfig>) -> Result<(), ContractError> {
    let Some(calibration) = calibration else {
        return Ok(());
    };
    let k = calibration.intrinsics;
    if !(k.fx.is_finite() && k.fy.is_finite() && k.fx > 0.0 && k.fy > 0.0) {
        return Err(ContractError::config_validation(
            "calibration.intrinsics",
            format!("focal lengths must be positive, got fx={} fy={}", k.fx, k.fy),
        ));
    }
    let principal = [k.cx, k.cy];
    let mut entries = calibration
        .homography
        .iter()
        .chain(calibration.rotation.iter())
        .flatten()
        .chain(calibration.translation.iter())
        .chain(calibration.distortion.iter())
        .chain(principal.iter());
    if entries.any(|v| !v.is_finite()) {
        return Err(ContractError::config_validation(
            "calibration",
            "calibration contains non-finite entries",
        ));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ContractError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ContractError::config_validation(
            field,
            format!("must be >= 0, got {value}"),
        ))
    }
}

fn validate_rules(rules: &RulesConfig) -> Result<(), ContractError> {
    non_negative("rules.cooldown_sec", rules.cooldown_sec)?;
    if !(0.0..=1.0).contains(&rules.min_confidence) {
        return Err(ContractError::config_validation(
            "rules.min_confidence",
            format!("must be within [0, 1], got {}", rules.min_confidence),
        ));
    }
    if rules.zone.confirmations == 0 {
        return Err(ContractError::config_validation(
            "rules.zone.confirmations",
            "must be >= 1",
        ));
    }
    non_negative("rules.speed.threshold_ms", rules.speed.threshold_ms)?;
    non_negative("rules.distance.threshold_m", rules.distance.threshold_m)?;
    non_negative("rules.fall.height_drop_m", rules.fall.height_drop_m)?;
    if !(rules.fall.window_sec.is_finite() && rules.fall.window_sec > 0.0) {
        return Err(ContractError::config_validation(
            "rules.fall.window_sec",
            format!("must be > 0, got {}", rules.fall.window_sec),
        ));
    }
    if !(0.0..=90.0).contains(&rules.fall.body_angle_deg) {
        return Err(ContractError::config_validation(
            "rules.fall.body_angle_deg",
            format!("must be within [0, 90], got {}", rules.fall.body_angle_deg),
        ));
    }
    Ok(())
}

/// 校验 zone_id 唯一性
fn validate_zone_ids(blueprint: &SystemBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, zone) in blueprint.zones.iter().enumerate() {
        if zone.zone_id.is_empty() {
            return Err(ContractError::config_validation(
                format!("zones[{idx}].zone_id"),
                "zone_id cannot be empty",
            ));
        }
        if !seen.insert(zone.zone_id.as_str()) {
            return Err(ContractError::config_validation(
                format!("zones[zone_id={}]", zone.zone_id),
                "duplicate zone_id",
            ));
        }
        if zone.rules.confirmations == Some(0) {
            return Err(ContractError::config_validation(
                format!("zones[{idx}].rules.confirmations"),
                "must be >= 1",
            ));
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &SystemBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", idx),
                "queue_capacity must be >= 1",
            ));
        }
    }
    Ok(())
}
