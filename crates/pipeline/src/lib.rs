//! 流水线编排
//!
//! 把 Frame Synchronizer、Fusion Engine、Movement Tracker、Rule Engine
//! 与 Event Dispatcher 串成一个单消费者流水线：
//!
//! ```text
//! 数据源 (回调线程) ──> SharedSynchronizer ──> Consumer ──> Dispatcher ──> Sinks
//!                                            │
//!                                            └─> HealthSnapshot (watch)
//! ```
//!
//! 轨迹表与规则状态只由消费者持有；区域配置通过 [`rules::ZoneHandle`] 热更新。

mod consumer;
mod error;
mod runtime;

pub use consumer::{Consumer, RunSummary};
pub use error::PipelineError;
pub use runtime::{Pipeline, PipelineBuilder, PipelineHandle};
