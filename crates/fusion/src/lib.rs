//! # Fusion
//!
//! 2D 检测 + 深度 → 世界坐标观测。
//!
//! - [`Calibration`]: 单应 + 内参 + 畸变 + 外参，启动时加载一次
//! - [`sample_depth`]: 检测框锚点邻域中值深度
//! - [`min_cost_assignment`]: 带门限的最小代价二分匹配
//! - [`FusionEngine`]: 每个 [`contracts::SyncedPair`] 产出一组 [`contracts::FusedObservation`]

mod assignment;
mod calibration;
mod engine;
mod sampling;

pub use assignment::{min_cost_assignment, Assignment};
pub use calibration::Calibration;
pub use engine::FusionEngine;
pub use sampling::{anchor_point, sample_depth};
