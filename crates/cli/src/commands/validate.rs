//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::{ConfigWarning, LoadReport};
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<ConfigWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    camera_id: String,
    calibrated: bool,
    zone_count: usize,
    enabled_zone_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_report_from_path(&args.config) {
        Ok(report) => build_result(config_path, report),
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn build_result(config_path: String, report: LoadReport) -> ValidationResult {
    let blueprint = &report.blueprint;
    let summary = ConfigSummary {
        version: format!("{:?}", blueprint.version),
        camera_id: blueprint.system.camera_id.clone(),
        calibrated: blueprint.calibration.is_some(),
        zone_count: blueprint.zones.len(),
        enabled_zone_count: blueprint.enabled_zones().count(),
        sink_count: blueprint.sinks.len(),
    };
    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: report.warnings,
        summary: Some(summary),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Camera: {}", summary.camera_id);
            println!("  Calibrated: {}", summary.calibrated);
            println!(
                "  Zones: {} ({} enabled)",
                summary.zone_count, summary.enabled_zone_count
            );
            println!("  Sinks: {}", summary.sink_count);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}: {}", warning.field, warning.message);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn make_config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_reports_disabled_zone() {
        let file = make_config_file(
            r#"
[system]
camera_id = "cam-01"
video_source_id = "video-01"
depth_source_id = "depth-01"

[[zones]]
zone_id = "door"
name = "Door"
geometry = { kind = "floor_polygon", points = [[0.0, 0.0], [1.0, 0.0]] }
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.zone_count, 1);
        assert_eq!(summary.enabled_zone_count, 0);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/fusion.toml"),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_rejects_same_sources() {
        let file = make_config_file(
            r#"
[system]
camera_id = "cam-01"
video_source_id = "cam"
depth_source_id = "cam"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }
}
