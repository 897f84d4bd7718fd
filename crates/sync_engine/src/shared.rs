//! Thread-safe handle shared by the two producers and the pipeline consumer.

use std::sync::Arc;

use contracts::{ContractError, SourceFrame, SyncStats, SyncedPair};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::engine::{FrameSynchronizer, IngestOutcome};

/// Cloneable synchronizer handle.
///
/// Producers call [`ingest`](Self::ingest) from their own threads; the lock is
/// held only for the buffer push, so a producer never waits on the other
/// one for longer than that. Each buffered frame wakes the consumer.
#[derive(Clone)]
pub struct SharedSynchronizer {
    inner: Arc<Mutex<FrameSynchronizer>>,
    notify: Arc<Notify>,
}

impl SharedSynchronizer {
    pub fn new(synchronizer: FrameSynchronizer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(synchronizer)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn ingest(&self, frame: SourceFrame) -> Result<IngestOutcome, ContractError> {
        let outcome = self.inner.lock().ingest(frame)?;
        if outcome != IngestOutcome::DroppedOutOfOrder {
            self.notify.notify_one();
        }
        Ok(outcome)
    }

    pub fn next_pair(&self) -> Option<SyncedPair> {
        self.inner.lock().next_pair()
    }

    pub fn next_video_only(&self) -> Option<SourceFrame> {
        self.inner.lock().next_video_only()
    }

    pub fn is_depth_degraded(&self) -> bool {
        self.inner.lock().is_depth_degraded()
    }

    pub fn stats(&self) -> SyncStats {
        self.inner.lock().stats()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Wait until a producer buffers a frame.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Wake the consumer without a new frame (used on shutdown).
    pub fn wake(&self) {
        self.notify.notify_one();
    }
}
