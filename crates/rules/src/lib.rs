//! # Rules
//!
//! 规则引擎：轨迹 → 行为事件。
//!
//! - 区域进入/离开 (射线法，N 次确认迟滞)
//! - 静止、跌倒、位移变化、超速、新目标
//! - 置信度 = 检测置信度 × 投影有效度 × 规则确定度
//! - 按 (object_id, event_type[, zone_id]) 冷却去重
//!
//! 区域通过 [`ZoneHandle`] 热更新，消费者每轮读取一次 [`ZoneSet`] 快照。

mod engine;
pub mod geometry;
mod zones;

pub use engine::RuleEngine;
pub use zones::{ZoneHandle, ZoneSet};
