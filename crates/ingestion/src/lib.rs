//! # Ingestion
//!
//! 帧接入模块。
//!
//! 负责：
//! - 注册 2D 视频源与 3D 深度源 (`FrameSource`，支持 Mock 与真实设备)
//! - 在数据源线程上把帧推入同步器的有界缓冲
//! - 每个源的接入计数 (接收/淘汰/乱序/拒绝)
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, MockFrameSource, MockScene};
//!
//! let scene = Arc::new(MockScene::walker(wall_clock_secs()));
//! let mut pipeline = IngestionPipeline::new(synchronizer.clone());
//! pipeline.register_source(Box::new(MockFrameSource::video("video-01", 15.0, scene.clone())))?;
//! pipeline.register_source(Box::new(MockFrameSource::depth("depth-01", 30.0, scene)))?;
//! pipeline.start_all();
//! ```

mod error;
mod metrics;
mod mock;
mod pipeline;

pub use contracts::{FrameSource, SourceFrame};
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::{MockFrameSource, MockScene, MockSourceConfig};
pub use pipeline::IngestionPipeline;
