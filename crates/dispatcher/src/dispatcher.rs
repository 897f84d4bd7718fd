//! Dispatcher - fan-out of events to sinks

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, instrument};

use contracts::{Event, SinkConfig, SinkHealth, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::sinks::{FileSink, FileSinkConfig, LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Sink configurations
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Build the dispatcher and start one worker per sink
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;
        info!(sinks = handles.len(), "Dispatcher started");
        Ok(Dispatcher { handles })
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut seen = HashSet::new();
        for sink_config in &config.sinks {
            if !seen.insert(sink_config.name.as_str()) {
                return Err(DispatcherError::DuplicateSink(sink_config.name.clone()));
            }
        }

        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config).await?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let file_config = FileSinkConfig::from_params(&config.params);
            let path = file_config.path.clone();
            let sink = FileSink::new(&config.name, file_config).map_err(|source| {
                DispatcherError::FileOpen {
                    name: config.name.clone(),
                    path,
                    source,
                }
            })?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|source| DispatcherError::SinkCreation {
                    name: config.name.clone(),
                    sink_type: config.sink_type,
                    source,
                })?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Fans every event out to all sinks without waiting on any of them
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>) -> Self {
        Self { handles }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    pub fn health(&self) -> Vec<SinkHealth> {
        self.handles.iter().map(SinkHandle::health).collect()
    }

    /// Enqueue the event on every sink; a full queue drops its oldest entry.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, event),
        fields(object_id = event.object_id, event_type = %event.event_type())
    )]
    pub fn dispatch(&self, event: &Event) {
        for handle in &self.handles {
            handle.try_send(event.clone());
        }
    }

    /// Drain every sink, waiting at most `timeout` per sink
    #[instrument(name = "dispatcher_shutdown", skip(self))]
    pub async fn shutdown(self, timeout: Duration) {
        for handle in &self.handles {
            handle.close();
        }
        for handle in self.handles {
            handle.shutdown(timeout).await;
        }
        info!("Dispatcher shutdown complete");
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs))]
pub async fn create_dispatcher(sink_configs: Vec<SinkConfig>) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config).build().await
}
