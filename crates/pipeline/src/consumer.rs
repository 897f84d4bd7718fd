//! The single pipeline consumer: Fusion -> Tracking -> Rules -> Dispatch.
//!
//! Owns the track table and all per-object rule state; nothing else mutates
//! them. Every pair is processed to completion before the next one is pulled.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    wall_clock_secs, Event, FusedObservation, HealthSnapshot, PipelineConfig, SourceFrame,
    SyncedPair, TrackEventKind, TrackerSnapshot,
};
use dispatcher::Dispatcher;
use fusion::FusionEngine;
use observability::{HealthAggregator, MetricsSummary};
use rules::{RuleEngine, ZoneSet};
use sync_engine::SharedSynchronizer;
use tokio::sync::watch;
use tracing::{debug, info, instrument};
use tracking::Tracker;

/// What a finished run hands back
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub metrics: MetricsSummary,
    pub health: HealthSnapshot,
    pub tracks: TrackerSnapshot,
}

pub struct Consumer {
    synchronizer: SharedSynchronizer,
    fusion: FusionEngine,
    tracker: Tracker,
    rules: RuleEngine,
    dispatcher: Dispatcher,
    zones: watch::Receiver<Arc<ZoneSet>>,
    config: PipelineConfig,
    health_tx: watch::Sender<HealthSnapshot>,
    aggregator: HealthAggregator,
    pairs_processed: u64,
    video_only_processed: u64,
    events_emitted: u64,
    last_lag_ms: f64,
}

impl Consumer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        synchronizer: SharedSynchronizer,
        fusion: FusionEngine,
        tracker: Tracker,
        rules: RuleEngine,
        dispatcher: Dispatcher,
        zones: watch::Receiver<Arc<ZoneSet>>,
        config: PipelineConfig,
        health_tx: watch::Sender<HealthSnapshot>,
    ) -> Self {
        Self {
            synchronizer,
            fusion,
            tracker,
            rules,
            dispatcher,
            zones,
            config,
            health_tx,
            aggregator: HealthAggregator::new(),
            pairs_processed: 0,
            video_only_processed: 0,
            events_emitted: 0,
            last_lag_ms: 0.0,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one synchronized pair through every stage.
    #[instrument(
        name = "pipeline_process_pair",
        skip(self, pair),
        fields(t = pair.timestamp(), delta_ms = pair.delta_t * 1000.0)
    )]
    pub fn process_pair(&mut self, pair: &SyncedPair) -> Vec<Event> {
        let observations = self.fusion.fuse(pair);
        self.aggregator.record_pair_delta(pair.delta_t);
        self.pairs_processed += 1;
        self.step(&observations, pair.timestamp())
    }

    /// Degraded mode: a 2D frame released without depth.
    #[instrument(
        name = "pipeline_process_video_only",
        skip(self, frame),
        fields(t = frame.capture_timestamp)
    )]
    pub fn process_video_only(&mut self, frame: &SourceFrame) -> Vec<Event> {
        let observations = self.fusion.fuse_video_only(frame);
        self.video_only_processed += 1;
        self.step(&observations, frame.capture_timestamp)
    }

    fn step(&mut self, observations: &[FusedObservation], timestamp: f64) -> Vec<Event> {
        let track_events = self.tracker.update(observations, timestamp);
        for notice in &track_events {
            if notice.kind == TrackEventKind::Lost {
                self.rules.forget(notice.object_id);
            }
        }

        let zones = Arc::clone(&self.zones.borrow_and_update());
        let mut events = Vec::new();
        for track in self.tracker.tracks() {
            events.extend(self.rules.evaluate(track, &zones, timestamp));
        }

        for event in &events {
            self.dispatcher.dispatch(event);
            self.aggregator.record_event(event.event_type());
        }
        self.events_emitted += events.len() as u64;

        self.last_lag_ms = (wall_clock_secs() - timestamp) * 1000.0;
        observability::record_pipeline_lag_ms(self.last_lag_ms);
        self.publish_health();
        events
    }

    /// Process everything the synchronizer can release right now.
    ///
    /// Returns the number of pairs and video-only frames handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        loop {
            if let Some(pair) = self.synchronizer.next_pair() {
                self.process_pair(&pair);
                handled += 1;
                continue;
            }
            if let Some(frame) = self.synchronizer.next_video_only() {
                self.process_video_only(&frame);
                handled += 1;
                continue;
            }
            break;
        }
        handled
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            taken_at: wall_clock_secs(),
            sources: self.synchronizer.stats().sources,
            pairs_processed: self.pairs_processed,
            video_only_processed: self.video_only_processed,
            tracks: self.tracker.counts(),
            pipeline_lag_ms: self.last_lag_ms,
            events_emitted: self.events_emitted,
            sinks: self.dispatcher.health(),
            degraded: self.fusion.is_video_only() || self.synchronizer.is_depth_degraded(),
        }
    }

    fn publish_health(&mut self) {
        let snapshot = self.health();
        observability::record_health(&snapshot);
        self.aggregator.update(&snapshot);
        self.health_tx.send_replace(snapshot);
    }

    /// Consumer loop. Returns once `shutdown` flips to true (or its sender
    /// is dropped), after draining what is already buffered and closing
    /// the sinks.
    #[instrument(name = "pipeline_consumer_run", skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> RunSummary {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        info!(
            poll_ms = poll.as_millis() as u64,
            video_only = self.fusion.is_video_only(),
            "Pipeline consumer started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            let handled = self.drain();
            if handled > 0 {
                debug!(handled, "Consumer cycle");
            }

            tokio::select! {
                _ = self.synchronizer.notified() => {}
                _ = tokio::time::sleep(poll) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let drained = self.drain();
        self.publish_health();
        info!(
            drained,
            pairs = self.pairs_processed,
            video_only = self.video_only_processed,
            events = self.events_emitted,
            "Pipeline consumer stopping"
        );

        let summary = RunSummary {
            metrics: self.aggregator.summary(),
            health: self.health(),
            tracks: self.tracker.snapshot(),
        };

        let timeout = Duration::from_millis(self.config.shutdown_timeout_ms);
        self.dispatcher.shutdown(timeout).await;
        summary
    }
}
