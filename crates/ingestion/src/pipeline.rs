//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{FrameCallback, FrameSource, SourceFrame, SourceId};
use sync_engine::{IngestOutcome, SharedSynchronizer};
use tracing::{debug, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::{IngestionMetrics, MetricsSnapshot};

struct RegisteredSource {
    source: Box<dyn FrameSource>,
    metrics: Arc<IngestionMetrics>,
}

/// Ingestion Pipeline
///
/// Connects frame sources to the synchronizer. Each source calls back on its
/// own thread; the frame is pushed straight into that source's buffer.
pub struct IngestionPipeline {
    sources: HashMap<SourceId, RegisteredSource>,
    synchronizer: SharedSynchronizer,
}

impl IngestionPipeline {
    pub fn new(synchronizer: SharedSynchronizer) -> Self {
        Self {
            sources: HashMap::new(),
            synchronizer,
        }
    }

    /// Register a frame source
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(source_id = %source.source_id(), kind = %source.kind())
    )]
    pub fn register_source(&mut self, source: Box<dyn FrameSource>) -> Result<()> {
        let source_id = SourceId::from(source.source_id());
        if self.sources.contains_key(&source_id) {
            return Err(IngestionError::AlreadyRegistered {
                source_id: source_id.to_string(),
            });
        }
        debug!(source_id = %source_id, "registered frame source");
        self.sources.insert(
            source_id,
            RegisteredSource {
                source,
                metrics: Arc::new(IngestionMetrics::new()),
            },
        );
        Ok(())
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting all frame sources");
        for (source_id, registered) in &self.sources {
            if registered.source.is_listening() {
                continue;
            }
            debug!(source_id = %source_id, "starting source");
            let callback = make_callback(
                source_id.clone(),
                self.synchronizer.clone(),
                Arc::clone(&registered.metrics),
            );
            registered.source.listen(callback);
        }
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping all frame sources");
        for (source_id, registered) in &self.sources {
            if registered.source.is_listening() {
                debug!(source_id = %source_id, "stopping source");
                registered.source.stop();
            }
        }
    }

    /// Push one frame on behalf of a registered source.
    pub fn push(&self, frame: SourceFrame) -> Result<IngestOutcome> {
        let registered =
            self.sources
                .get(&frame.source_id)
                .ok_or_else(|| IngestionError::UnknownSource {
                    source_id: frame.source_id.to_string(),
                })?;
        forward(&self.synchronizer, &registered.metrics, frame)
    }

    pub fn synchronizer(&self) -> &SharedSynchronizer {
        &self.synchronizer
    }

    pub fn metrics(&self, source_id: &str) -> Option<MetricsSnapshot> {
        self.sources
            .get(source_id)
            .map(|registered| registered.metrics.snapshot())
    }

    /// Snapshots of every source, ordered by source id
    pub fn all_metrics(&self) -> Vec<(SourceId, MetricsSnapshot)> {
        let mut all: Vec<_> = self
            .sources
            .iter()
            .map(|(id, registered)| (id.clone(), registered.metrics.snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        all
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.sources
            .get(source_id)
            .map(|registered| registered.source.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn forward(
    synchronizer: &SharedSynchronizer,
    metrics: &IngestionMetrics,
    frame: SourceFrame,
) -> Result<IngestOutcome> {
    let source_id = frame.source_id.clone();
    metrics.record_received(frame.capture_timestamp);
    match synchronizer.ingest(frame) {
        Ok(outcome) => {
            metrics.record_outcome(outcome);
            Ok(outcome)
        }
        Err(e) => {
            metrics.record_rejected();
            Err(IngestionError::rejected(source_id.as_str(), e))
        }
    }
}

fn make_callback(
    source_id: SourceId,
    synchronizer: SharedSynchronizer,
    metrics: Arc<IngestionMetrics>,
) -> FrameCallback {
    Arc::new(move |frame| {
        if let Err(e) = forward(&synchronizer, &metrics, frame) {
            warn!(source_id = %source_id, error = %e, "frame rejected");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFrameSource, MockScene};
    use contracts::{wall_clock_secs, SyncConfig, VideoPayload};
    use std::time::Duration;
    use sync_engine::FrameSynchronizer;

    fn make_synchronizer() -> SharedSynchronizer {
        SharedSynchronizer::new(FrameSynchronizer::new(
            "video",
            "depth",
            SyncConfig::default(),
        ))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let scene = Arc::new(MockScene::walker(0.0));
        let mut pipeline = IngestionPipeline::new(make_synchronizer());
        pipeline
            .register_source(Box::new(MockFrameSource::video("video", 10.0, scene.clone())))
            .unwrap();
        let err = pipeline
            .register_source(Box::new(MockFrameSource::video("video", 10.0, scene)))
            .unwrap_err();
        assert!(matches!(err, IngestionError::AlreadyRegistered { .. }));
        assert_eq!(pipeline.source_count(), 1);
    }

    #[test]
    fn test_push_counts_outcomes() {
        let scene = Arc::new(MockScene::walker(0.0));
        let mut pipeline = IngestionPipeline::new(make_synchronizer());
        pipeline
            .register_source(Box::new(MockFrameSource::video("video", 10.0, scene)))
            .unwrap();

        let frame = |t: f64| SourceFrame::video("video", t, 0, VideoPayload::default());
        assert_eq!(pipeline.push(frame(1.0)).unwrap(), IngestOutcome::Buffered);
        assert_eq!(
            pipeline.push(frame(0.5)).unwrap(),
            IngestOutcome::DroppedOutOfOrder
        );
        assert!(matches!(
            pipeline.push(SourceFrame::video("other", 2.0, 0, VideoPayload::default())),
            Err(IngestionError::UnknownSource { .. })
        ));

        let snap = pipeline.metrics("video").unwrap();
        assert_eq!(snap.frames_received, 2);
        assert_eq!(snap.frames_out_of_order, 1);
    }

    #[test]
    fn test_mock_sources_feed_synchronizer() {
        let scene = Arc::new(MockScene::walker(wall_clock_secs()));
        let mut pipeline = IngestionPipeline::new(make_synchronizer());
        pipeline
            .register_source(Box::new(MockFrameSource::video("video", 50.0, scene.clone())))
            .unwrap();
        pipeline
            .register_source(Box::new(MockFrameSource::depth("depth", 50.0, scene)))
            .unwrap();

        pipeline.start_all();
        assert!(pipeline.is_source_listening("video"));
        std::thread::sleep(Duration::from_millis(200));
        pipeline.stop_all();
        assert!(!pipeline.is_source_listening("depth"));

        assert!(pipeline.synchronizer().next_pair().is_some());
        let all = pipeline.all_metrics();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0.as_str(), "depth");
        assert!(all.iter().all(|(_, snap)| snap.frames_received > 0));
    }
}
