//! SinkHandle - manages a sink with isolated queue and worker task
//!
//! The queue is a bounded `async_channel`; when it is full the oldest queued
//! event is evicted so `try_send` never blocks the pipeline consumer.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{bounded, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Event, EventSink, SinkHealth};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: Sender<Event>,
    metrics: Arc<SinkMetrics>,
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task.
    ///
    /// `queue_capacity` is clamped to at least 1.
    pub fn spawn<S: EventSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = bounded(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    pub fn health(&self) -> SinkHealth {
        self.metrics.health(&self.name)
    }

    /// Enqueue an event without blocking.
    ///
    /// Returns false when an older event had to be evicted or the worker is
    /// gone.
    pub fn try_send(&self, event: Event) -> bool {
        match self.tx.force_send(event) {
            Ok(None) => {
                self.metrics.observe_queue(self.tx.len());
                true
            }
            Ok(Some(evicted)) => {
                self.metrics.record_eviction();
                self.metrics.observe_queue(self.tx.len());
                warn!(
                    sink = %self.name,
                    object_id = evicted.object_id,
                    event_type = %evicted.event_type(),
                    "Queue full, oldest event dropped"
                );
                false
            }
            Err(_) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Stop accepting events; queued ones are still drained.
    pub fn close(&self) {
        self.tx.close();
    }

    /// Close the queue and wait for the worker to drain, flush and close
    /// the sink. Aborts the worker after `timeout`.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self, timeout: Duration) {
        self.tx.close();
        let mut worker = self.worker_handle;
        match tokio::time::timeout(timeout, &mut worker).await {
            Ok(Ok(())) => debug!(sink = %self.name, "SinkHandle shutdown complete"),
            Ok(Err(e)) => error!(sink = %self.name, error = ?e, "Worker task panicked"),
            Err(_) => {
                warn!(
                    sink = %self.name,
                    pending = self.tx.len(),
                    "Sink did not drain in time, aborting worker"
                );
                worker.abort();
            }
        }
    }
}

/// Worker task that consumes events and writes to sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: EventSink>(
    mut sink: S,
    rx: Receiver<Event>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Ok(event) = rx.recv().await {
        metrics.observe_queue(rx.len());

        match sink.write(&event).await {
            Ok(()) => {
                metrics.record_write(true);
                observability::record_event_dispatched(&name, true);
            }
            Err(e) => {
                metrics.record_write(false);
                observability::record_event_dispatched(&name, false);
                error!(
                    sink = %name,
                    object_id = event.object_id,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{epoch_to_utc, ContractError, EventKind, NewObjectDetails};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::sleep;

    /// Mock sink for testing
    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl EventSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _event: &Event) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn make_event(object_id: u64) -> Event {
        Event {
            timestamp: epoch_to_utc(1_700_000_000.0),
            camera_id: "cam-01".into(),
            object_id,
            confidence: 1.0,
            position: None,
            kind: EventKind::NewObject(NewObjectDetails {
                class: "person".into(),
                has_position: false,
            }),
        }
    }

    fn make_sink(name: &str, should_fail: bool, delay_ms: u64) -> (MockSink, Arc<AtomicU64>) {
        let write_count = Arc::new(AtomicU64::new(0));
        let sink = MockSink {
            name: name.to_string(),
            write_count: Arc::clone(&write_count),
            should_fail,
            delay_ms,
        };
        (sink, write_count)
    }

    #[tokio::test]
    async fn test_sink_handle_basic() {
        let (sink, write_count) = make_sink("test", false, 0);
        let handle = SinkHandle::spawn(sink, 10);

        for i in 0..5 {
            assert!(handle.try_send(make_event(i)));
        }

        handle.shutdown(Duration::from_secs(1)).await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full_drops_oldest() {
        let (sink, write_count) = make_sink("slow", false, 50);
        let handle = SinkHandle::spawn(sink, 2);

        for i in 0..10 {
            handle.try_send(make_event(i));
        }

        assert!(handle.metrics().dropped_count() > 0);
        let metrics = Arc::clone(handle.metrics());
        handle.shutdown(Duration::from_secs(5)).await;
        // everything not evicted was written
        assert_eq!(
            write_count.load(Ordering::Relaxed) + metrics.dropped_count(),
            10
        );
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let (sink, _) = make_sink("failing", true, 0);
        let handle = SinkHandle::spawn(sink, 10);

        for i in 0..3 {
            handle.try_send(make_event(i));
        }

        sleep(Duration::from_millis(50)).await;

        assert_eq!(handle.metrics().failure_count(), 3);
        assert_eq!(handle.health().name, "failing");

        handle.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_shutdown_timeout_aborts_stuck_sink() {
        let (sink, _) = make_sink("stuck", false, 10_000);
        let handle = SinkHandle::spawn(sink, 4);
        handle.try_send(make_event(1));
        sleep(Duration::from_millis(10)).await;

        let started = std::time::Instant::now();
        handle.shutdown(Duration::from_millis(100)).await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
