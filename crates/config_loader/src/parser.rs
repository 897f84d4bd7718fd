//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, SystemBlueprint};

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
pub fn parse_toml(content: &str) -> Result<SystemBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<SystemBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<SystemBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReferencePlane, SinkType, ZoneGeometry};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[system]
camera_id = "cam-01"
video_source_id = "cctv-01"
depth_source_id = "depth-01"

[sync]
tolerance_ms = 80.0

[[zones]]
zone_id = "dock"
name = "Loading dock"
[zones.geometry]
kind = "floor_polygon"
plane = "xz"
points = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]]

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.system.video_source_id, "cctv-01");
        assert_eq!(bp.sync.tolerance_ms, 80.0);
        assert_eq!(bp.sync.buffer_capacity, 60);
        assert_eq!(bp.zones.len(), 1);
        assert!(matches!(
            bp.zones[0].geometry,
            ZoneGeometry::FloorPolygon {
                plane: ReferencePlane::Xz,
                ..
            }
        ));
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
        assert_eq!(bp.sinks[0].queue_capacity, 100);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "system": {
                "camera_id": "cam-01",
                "video_source_id": "cctv-01",
                "depth_source_id": "depth-01"
            },
            "calibration": {
                "intrinsics": { "fx": 500.0, "fy": 500.0, "cx": 320.0, "cy": 240.0 }
            },
            "sinks": [{ "name": "log", "sink_type": "log" }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let calibration = result.unwrap().calibration.unwrap();
        assert_eq!(calibration.homography[0], [1.0, 0.0, 0.0]);
        assert_eq!(calibration.translation, [0.0; 3]);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_system_section() {
        assert!(parse_toml("[sync]\ntolerance_ms = 50.0\n").is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
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
