//! # Sync Engine
//!
//! 双源帧同步引擎：2D 视频源 + 3D 深度源。
//!
//! 负责：
//! - 每个源一个有界 FIFO (满时丢弃最旧帧)
//! - 基于容差窗口的贪心最近时间戳配对
//! - 过期帧/乱序帧丢弃与计数
//! - 深度不可用时的仅 2D 降级输出
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{FrameSynchronizer, SyncConfig};
//!
//! let mut sync = FrameSynchronizer::new("cctv-01", "depth-01", SyncConfig::default());
//! sync.ingest(frame)?;
//! while let Some(pair) = sync.next_pair() {
//!     // fuse
//! }
//! ```

mod buffer;
mod engine;
pub mod matcher;
mod shared;

pub use buffer::{FrameBuffer, PushOutcome};
pub use engine::{FrameSynchronizer, IngestOutcome};
pub use shared::SharedSynchronizer;

pub use contracts::{SyncConfig, SyncQuality, SyncStats, SyncedPair};
