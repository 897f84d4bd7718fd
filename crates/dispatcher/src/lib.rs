//! # Dispatcher
//!
//! 事件分发模块。
//!
//! 负责：
//! - 将规则引擎产出的 `Event` fan-out 到多个 sinks
//! - 每个 sink 独立队列，满时丢弃最旧事件
//! - 隔离慢 sink，不阻塞主链路

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{Event, EventSink};
pub use dispatcher::{
    create_dispatcher, create_sink_handle, Dispatcher, DispatcherBuilder, DispatcherConfig,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::SinkMetrics;
pub use sinks::{FileSink, FileSinkConfig, LogSink, MemorySink, NetworkSink, NetworkSinkConfig};
