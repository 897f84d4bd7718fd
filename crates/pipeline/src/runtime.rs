//! Wiring of all stages plus the handle used to observe and stop a run.

use contracts::{HealthSnapshot, SystemBlueprint};
use dispatcher::{create_dispatcher, Dispatcher};
use fusion::FusionEngine;
use rules::{RuleEngine, ZoneHandle};
use sync_engine::{FrameSynchronizer, SharedSynchronizer};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use tracking::Tracker;

use crate::consumer::{Consumer, RunSummary};
use crate::error::PipelineError;

/// Builder for creating a Pipeline
pub struct PipelineBuilder {
    blueprint: SystemBlueprint,
    dispatcher: Option<Dispatcher>,
}

impl PipelineBuilder {
    pub fn new(blueprint: SystemBlueprint) -> Self {
        Self {
            blueprint,
            dispatcher: None,
        }
    }

    /// Use an already built dispatcher instead of the configured sinks
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[instrument(name = "pipeline_builder_build", skip(self))]
    pub async fn build(self) -> Result<Pipeline, PipelineError> {
        let blueprint = self.blueprint;
        let fusion = FusionEngine::from_blueprint(&blueprint)?;
        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => create_dispatcher(blueprint.sinks.clone()).await?,
        };

        let synchronizer = SharedSynchronizer::new(FrameSynchronizer::new(
            blueprint.system.video_source_id.as_str(),
            blueprint.system.depth_source_id.as_str(),
            blueprint.sync.clone(),
        ));
        let zones = ZoneHandle::new(blueprint.zones.iter().cloned());

        info!(
            camera_id = %blueprint.system.camera_id,
            zones = zones.current().len(),
            sinks = dispatcher.sink_count(),
            video_only = fusion.is_video_only(),
            "Pipeline built"
        );

        Ok(Pipeline {
            tracker: Tracker::new(blueprint.tracker.clone()),
            rules: RuleEngine::from_blueprint(&blueprint),
            config: blueprint.pipeline.clone(),
            fusion,
            dispatcher,
            synchronizer,
            zones,
        })
    }
}

/// All stages, ready to be spawned
pub struct Pipeline {
    synchronizer: SharedSynchronizer,
    zones: ZoneHandle,
    fusion: FusionEngine,
    tracker: Tracker,
    rules: RuleEngine,
    dispatcher: Dispatcher,
    config: contracts::PipelineConfig,
}

impl Pipeline {
    /// Producers push frames here
    pub fn synchronizer(&self) -> SharedSynchronizer {
        self.synchronizer.clone()
    }

    pub fn zones(&self) -> ZoneHandle {
        self.zones.clone()
    }

    /// Split into a consumer that can be driven by hand (tests, replays) and
    /// the receiver of its health snapshots.
    pub fn into_consumer(self) -> (Consumer, watch::Receiver<HealthSnapshot>) {
        let (health_tx, health_rx) = watch::channel(HealthSnapshot::default());
        let consumer = Consumer::new(
            self.synchronizer,
            self.fusion,
            self.tracker,
            self.rules,
            self.dispatcher,
            self.zones.subscribe(),
            self.config,
            health_tx,
        );
        (consumer, health_rx)
    }

    /// Start the consumer task
    pub fn spawn(self) -> PipelineHandle {
        let synchronizer = self.synchronizer.clone();
        let zones = self.zones.clone();
        let (consumer, health_rx) = self.into_consumer();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(consumer.run(shutdown_rx));

        PipelineHandle {
            synchronizer,
            zones,
            health_rx,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a running pipeline
pub struct PipelineHandle {
    synchronizer: SharedSynchronizer,
    zones: ZoneHandle,
    health_rx: watch::Receiver<HealthSnapshot>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<RunSummary>,
}

impl PipelineHandle {
    pub fn synchronizer(&self) -> SharedSynchronizer {
        self.synchronizer.clone()
    }

    /// Hot-reload entry point for zone configuration
    pub fn zones(&self) -> ZoneHandle {
        self.zones.clone()
    }

    pub fn health(&self) -> watch::Receiver<HealthSnapshot> {
        self.health_rx.clone()
    }

    /// Latest published snapshot
    pub fn latest_health(&self) -> HealthSnapshot {
        self.health_rx.borrow().clone()
    }

    /// Stop the consumer after it drains buffered frames, then close sinks.
    ///
    /// Producers should be stopped first so nothing new arrives.
    #[instrument(name = "pipeline_shutdown", skip(self))]
    pub async fn shutdown(self) -> Result<RunSummary, PipelineError> {
        self.shutdown_tx.send_replace(true);
        self.synchronizer.wake();
        let summary = self
            .task
            .await
            .map_err(|e| PipelineError::Consumer(e.to_string()))?;
        info!(
            pairs = summary.metrics.pairs,
            events = summary.metrics.events_emitted,
            "Pipeline shutdown complete"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}
