//! Session orchestrator - wires synthetic sources into a running pipeline.
//!
//! Acquisition hardware is outside this binary: the 2D and 3D sources are
//! [`MockFrameSource`]s replaying a walker scene on the capture clock.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{wall_clock_secs, SystemBlueprint};
use ingestion::{IngestionPipeline, MockFrameSource, MockScene};
use pipeline::PipelineBuilder;
use tracing::{info, warn};

use super::RunStats;

const HEALTH_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub blueprint: SystemBlueprint,

    /// Stop after this long (None = until the shutdown signal)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Capture-time jitter applied by the synthetic sources (ms)
    pub jitter_ms: f64,
}

pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until the duration elapses or `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunStats> {
        let started = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        if blueprint.calibration.is_none() {
            warn!("No calibration configured, running 2D-only");
        }

        let handle = PipelineBuilder::new(blueprint.clone())
            .build()
            .await
            .context("Failed to build pipeline")?
            .spawn();

        let scene = Arc::new(MockScene::walker(wall_clock_secs()));
        let system = &blueprint.system;
        let mut ingestion = IngestionPipeline::new(handle.synchronizer());
        ingestion
            .register_source(Box::new(
                MockFrameSource::video(&system.video_source_id, system.video_fps, Arc::clone(&scene))
                    .with_jitter_ms(self.config.jitter_ms),
            ))
            .context("Failed to register video source")?;
        ingestion
            .register_source(Box::new(
                MockFrameSource::depth(&system.depth_source_id, system.depth_fps, Arc::clone(&scene))
                    .with_jitter_ms(self.config.jitter_ms),
            ))
            .context("Failed to register depth source")?;

        info!(
            camera_id = %system.camera_id,
            video_fps = system.video_fps,
            depth_fps = system.depth_fps,
            duration = ?self.config.duration,
            "Starting synthetic sources"
        );
        ingestion.start_all();

        let deadline = async {
            match self.config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut report = tokio::time::interval(HEALTH_REPORT_INTERVAL);
        report.tick().await;
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!("Run duration reached");
                    break;
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    break;
                }
                _ = report.tick() => {
                    let health = handle.latest_health();
                    info!(
                        pairs = health.pairs_processed,
                        video_only = health.video_only_processed,
                        active = health.tracks.active,
                        idle = health.tracks.idle,
                        events = health.events_emitted,
                        lag_ms = format!("{:.1}", health.pipeline_lag_ms),
                        degraded = health.degraded,
                        "Pipeline health"
                    );
                }
            }
        }

        // producers first, then drain the consumer and close sinks
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        let summary = handle
            .shutdown()
            .await
            .context("Pipeline did not shut down cleanly")?;

        let stats = RunStats {
            duration: started.elapsed(),
            sources: ingestion.all_metrics(),
            summary,
        };
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            pairs_per_sec = format!("{:.2}", stats.pairs_per_sec()),
            "Session complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_runs_for_duration() {
        let blueprint = SystemBlueprint {
            calibration: Some(MockScene::walker(0.0).calibration()),
            ..Default::default()
        };
        let session = Session::new(SessionConfig {
            blueprint,
            duration: Some(Duration::from_millis(600)),
            metrics_port: None,
            jitter_ms: 0.0,
        });

        let stats = session.run(std::future::pending()).await.unwrap();

        assert_eq!(stats.sources.len(), 2);
        assert!(stats.sources.iter().all(|(_, m)| m.frames_received > 0));
        assert!(stats.summary.metrics.pairs > 0);
        assert!(stats.summary.tracks.counts.new + stats.summary.tracks.counts.active >= 1);
    }

    #[tokio::test]
    async fn test_session_stops_on_signal() {
        let session = Session::new(SessionConfig {
            blueprint: SystemBlueprint::default(),
            duration: None,
            metrics_port: None,
            jitter_ms: 2.0,
        });

        let stats = session
            .run(tokio::time::sleep(Duration::from_millis(300)))
            .await
            .unwrap();

        assert!(stats.duration < Duration::from_secs(5));
        assert!(stats.summary.health.degraded);
    }
}
