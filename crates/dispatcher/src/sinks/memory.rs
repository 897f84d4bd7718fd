//! MemorySink - keeps events in a shared buffer

use std::sync::{Arc, Mutex};

use contracts::{ContractError, Event, EventSink};

/// Collects every event; clones share the same buffer.
#[derive(Debug, Clone)]
pub struct MemorySink {
    name: String,
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Copy of everything written so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        self.events
            .lock()
            .map_err(|_| ContractError::sink_write(&self.name, "buffer poisoned"))?
            .push(event.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
