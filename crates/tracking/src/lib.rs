//! # Tracking
//!
//! 运动跟踪：观测 → 轨迹。
//!
//! - 全局贪心关联 (3D 距离门限随时间放大，2D 观测用 IoU)
//! - 状态机 NEW → ACTIVE ⇄ IDLE，超时 → LOST 并移除
//! - 滑动窗口运动学：窗口路径长度、速度、方向
//!
//! 轨迹表只由单个消费者持有；外部读取通过 [`Tracker::snapshot`]。

mod track;
mod tracker;

pub use track::{Kinematics, PositionSample, Track};
pub use tracker::Tracker;
