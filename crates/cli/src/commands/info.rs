//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{SystemBlueprint, Zone, ZoneGeometry};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    system: SystemInfo,
    sync: SyncInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    zones: Vec<ZoneInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SystemInfo {
    camera_id: String,
    video_source_id: String,
    video_fps: f64,
    depth_source_id: String,
    depth_fps: f64,
    calibrated: bool,
}

#[derive(Serialize)]
struct SyncInfo {
    tolerance_ms: f64,
    buffer_capacity: usize,
    video_only_fallback: bool,
}

#[derive(Serialize)]
struct ZoneInfo {
    zone_id: String,
    name: String,
    shape: String,
    enabled: bool,
    priority: u8,
    entry: bool,
    exit: bool,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn shape_of(zone: &Zone) -> String {
    match &zone.geometry {
        ZoneGeometry::FloorPolygon { plane, points } => {
            format!("floor polygon ({:?}, {} points)", plane, points.len())
        }
        ZoneGeometry::Bounds { min, max } => format!("bounds {:?} .. {:?}", min, max),
        ZoneGeometry::ImagePolygon { points } => format!("image polygon ({} points)", points.len()),
    }
}

fn build_config_info(blueprint: &SystemBlueprint, args: &InfoArgs) -> ConfigInfo {
    let system = &blueprint.system;

    let zones = if args.zones {
        blueprint
            .zones
            .iter()
            .map(|z| ZoneInfo {
                zone_id: z.zone_id.clone(),
                name: z.name.clone(),
                shape: shape_of(z),
                enabled: z.enabled,
                priority: z.priority,
                entry: z.rules.entry,
                exit: z.rules.exit,
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        system: SystemInfo {
            camera_id: system.camera_id.clone(),
            video_source_id: system.video_source_id.clone(),
            video_fps: system.video_fps,
            depth_source_id: system.depth_source_id.clone(),
            depth_fps: system.depth_fps,
            calibrated: blueprint.calibration.is_some(),
        },
        sync: SyncInfo {
            tolerance_ms: blueprint.sync.tolerance_ms,
            buffer_capacity: blueprint.sync.buffer_capacity,
            video_only_fallback: blueprint.sync.video_only_fallback,
        },
        zones,
        sinks,
    }
}

fn print_config_info(blueprint: &SystemBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Fusion Tracker Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let system = &blueprint.system;
    println!("📍 System");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Camera: {}", system.camera_id);
    println!(
        "   ├─ Video: {} ({} Hz)",
        system.video_source_id, system.video_fps
    );
    println!(
        "   ├─ Depth: {} ({} Hz)",
        system.depth_source_id, system.depth_fps
    );
    match &blueprint.calibration {
        Some(calibration) => {
            let k = calibration.intrinsics;
            println!(
                "   └─ Calibration: fx={} fy={} cx={} cy={}",
                k.fx, k.fy, k.cx, k.cy
            );
        }
        None => println!("   └─ Calibration: none (2D-only)"),
    }

    let sync = &blueprint.sync;
    println!("\n⚙️  Sync Settings");
    println!("   ├─ Tolerance: {} ms", sync.tolerance_ms);
    println!("   ├─ Buffer capacity: {}", sync.buffer_capacity);
    println!(
        "   └─ Video-only fallback: {} (after {} s)",
        sync.video_only_fallback, sync.depth_unavailable_after_sec
    );

    println!("\n🗺  Zones ({})", blueprint.zones.len());
    for (i, zone) in blueprint.zones.iter().enumerate() {
        let is_last = i == blueprint.zones.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let status = if zone.enabled { "" } else { " [disabled]" };
        if args.zones {
            println!(
                "   {} {} \"{}\" {} priority={}{}",
                prefix,
                zone.zone_id,
                zone.name,
                shape_of(zone),
                zone.priority,
                status
            );
        } else {
            println!("   {} {}{}", prefix, zone.zone_id, status);
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue={}) {:?}",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity, sink.params
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
