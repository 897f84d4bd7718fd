//! LogSink - logs events via tracing

use contracts::{ContractError, Event, EventSink};
use tracing::{info, instrument};

/// Sink that logs one line per event
pub struct LogSink {
    name: String,
    written: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
        }
    }

    fn log_event(&self, event: &Event) {
        let (x, y, z) = event
            .position
            .map(|p| (p.x, p.y, p.z))
            .unwrap_or((f64::NAN, f64::NAN, f64::NAN));
        info!(
            sink = %self.name,
            event_type = %event.event_type(),
            camera_id = %event.camera_id,
            object_id = event.object_id,
            confidence = event.confidence,
            zone_id = event.kind.zone_id().unwrap_or("-"),
            x,
            y,
            z,
            timestamp = %event.timestamp,
            "Event"
        );
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, event),
        fields(sink = %self.name, object_id = event.object_id)
    )]
    async fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        self.log_event(event);
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, events = self.written, "LogSink closed");
        Ok(())
    }
}
