//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let report = config_loader::ConfigLoader::load_report_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let blueprint = report.blueprint;

    info!(
        camera_id = %blueprint.system.camera_id,
        zones = blueprint.enabled_zones().count(),
        sinks = blueprint.sinks.len(),
        calibrated = blueprint.calibration.is_some(),
        warnings = report.warnings.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let session = Session::new(SessionConfig {
        blueprint,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
        jitter_ms: args.jitter_ms.max(0.0),
    });

    info!("Starting pipeline...");
    let stats = session
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;
    stats.print_summary();

    info!("Fusion Tracker finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that fails to install never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::SystemBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("System:");
    println!("  Camera: {}", blueprint.system.camera_id);
    println!(
        "  Video source: {} ({} Hz)",
        blueprint.system.video_source_id, blueprint.system.video_fps
    );
    println!(
        "  Depth source: {} ({} Hz)",
        blueprint.system.depth_source_id, blueprint.system.depth_fps
    );
    println!(
        "  Calibration: {}",
        if blueprint.calibration.is_some() {
            "loaded"
        } else {
            "missing (2D-only)"
        }
    );

    println!("\nSync Settings:");
    println!("  Tolerance: {} ms", blueprint.sync.tolerance_ms);
    println!("  Buffer capacity: {}", blueprint.sync.buffer_capacity);
    println!("  Video-only fallback: {}", blueprint.sync.video_only_fallback);

    println!("\nZones ({} enabled):", blueprint.enabled_zones().count());
    for zone in blueprint.enabled_zones() {
        println!("  - {} ({})", zone.zone_id, zone.name);
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
