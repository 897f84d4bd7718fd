//! # Config Loader
//!
//! 配置加载与解析模块。
//!
//! 负责：
//! - 解析 TOML/JSON 配置文件
//! - 校验配置合法性 (字段级 + 跨字段)
//! - 禁用几何非法的区域并给出警告
//! - 生成 `SystemBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! println!("Camera: {}", blueprint.system.camera_id);
//! ```

mod parser;
mod validator;

pub use contracts::SystemBlueprint;
pub use parser::ConfigFormat;
pub use validator::ConfigWarning;

use contracts::ContractError;
use std::path::Path;

/// A loaded blueprint plus the non-fatal problems found while loading it
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub blueprint: SystemBlueprint,
    pub warnings: Vec<ConfigWarning>,
}

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SystemBlueprint, ContractError> {
        Self::load_report_from_path(path).map(|report| report.blueprint)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SystemBlueprint, ContractError> {
        Self::load_report_from_str(content, format).map(|report| report.blueprint)
    }

    /// Like [`load_from_path`](Self::load_from_path), keeping the warnings
    pub fn load_report_from_path(path: &Path) -> Result<LoadReport, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_report_from_str(&content, format)
    }

    pub fn load_report_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoadReport, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize SystemBlueprint to TOML string
    pub fn to_toml(blueprint: &SystemBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize SystemBlueprint to JSON string
    pub fn to_json(blueprint: &SystemBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse, validate, then sanitize configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<LoadReport, ContractError> {
        let mut blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        let warnings = validator::sanitize(&mut blueprint);
        Ok(LoadReport {
            blueprint,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[system]
camera_id = "cam-01"
video_source_id = "cctv-01"
depth_source_id = "depth-01"

[calibration.intrinsics]
fx = 500.0
fy = 500.0
cx = 320.0
cy = 240.0

[tracker]
lost_timeout_sec = 4.0

[rules]
cooldown_sec = 2.0

[rules.speed]
threshold_ms = 2.5

[[zones]]
zone_id = "dock"
name = "Loading dock"
zone_type = "restricted"
[zones.geometry]
kind = "floor_polygon"
points = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]

[[zones]]
zone_id = "ghost"
name = "Half-drawn"
[zones.geometry]
kind = "image_polygon"
points = [[0.0, 0.0], [10.0, 0.0]]

[[sinks]]
name = "log_sink"
sink_type = "log"

[[sinks]]
name = "events_file"
sink_type = "file"
queue_capacity = 500
[sinks.params]
path = "./output/events.jsonl"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_report_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let report = result.unwrap();
        let bp = &report.blueprint;
        assert_eq!(bp.system.camera_id, "cam-01");
        assert_eq!(bp.tracker.lost_timeout_sec, 4.0);
        assert_eq!(bp.rules.speed.threshold_ms, 2.5);
        assert!(bp.rules.fall.enabled);
        assert!(bp.zones[0].enabled);
        assert!(!bp.zones[1].enabled);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "zones[1].geometry");
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.system.camera_id, bp2.system.camera_id);
        assert_eq!(bp.zones, bp2.zones);
        assert_eq!(bp.sinks.len(), bp2.sinks.len());
        assert_eq!(bp.calibration, bp2.calibration);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.system.camera_id, bp2.system.camera_id);
        assert_eq!(bp.sinks[1].params, bp2.sinks[1].params);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[system]
camera_id = "cam-01"
video_source_id = "same"
depth_source_id = "same"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = std::env::temp_dir().join(format!("config_loader_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("system.toml");
        std::fs::write(&toml_path, MINIMAL_TOML).unwrap();
        assert!(ConfigLoader::load_from_path(&toml_path).is_ok());

        let yaml_path = dir.join("system.yaml");
        std::fs::write(&yaml_path, "system: {}").unwrap();
        let err = ConfigLoader::load_from_path(&yaml_path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
