//! FileSink - persists events as JSON Lines

use contracts::{ContractError, Event, EventSink};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file; parent directories are created
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map (`path`, `append`)
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output/events.jsonl"));
        let append = params
            .get("append")
            .map(|v| !matches!(v.as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Self { path, append }
    }
}

/// Sink that writes one JSON document per line
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(BufWriter::new(file)),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    fn append_line(&mut self, event: &Event) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file sink closed"))?;
        serde_json::to_writer(&mut *writer, event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn persist_event(&mut self, event: &Event) -> Result<(), ContractError> {
        self.append_line(event).map_err(|e| {
            error!(sink = %self.name, object_id = event.object_id, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl EventSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, event),
        fields(sink = %self.name, object_id = event.object_id)
    )]
    async fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        self.persist_event(event)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, lines = self.lines, path = %self.config.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{epoch_to_utc, EventKind, SpeedDetails};
    use tempfile::tempdir;

    fn make_event(object_id: u64) -> Event {
        Event {
            timestamp: epoch_to_utc(1_700_000_000.5),
            camera_id: "cam-01".into(),
            object_id,
            confidence: 0.9,
            position: None,
            kind: EventKind::SpeedAlert(SpeedDetails {
                speed_ms: 2.5,
                threshold_ms: 2.0,
                direction: None,
            }),
        }
    }

    #[tokio::test]
    async fn test_file_sink_writes_json_lines() {
        let dir = tempdir().unwrap();
        let config = FileSinkConfig {
            path: dir.path().join("nested").join("events.jsonl"),
            append: true,
        };

        let mut sink = FileSink::new("test_file", config).unwrap();
        sink.write(&make_event(1)).await.unwrap();
        sink.write(&make_event(2)).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(dir.path().join("nested").join("events.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "speed_alert");
        assert_eq!(first["object_id"], 1);
        assert!(first["position"].is_null());

        // writes after close fail instead of panicking
        assert!(sink.write(&make_event(3)).await.is_err());
    }

    #[tokio::test]
    async fn test_file_sink_truncate_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        fs::write(&path, "stale\n").unwrap();

        let mut params = HashMap::new();
        params.insert("path".to_string(), path.display().to_string());
        params.insert("append".to_string(), "false".to_string());
        let mut sink = FileSink::from_params("f", &params).unwrap();
        sink.write(&make_event(1)).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(!content.contains("stale"));
    }
}
