//! Run session: synthetic sources feeding a spawned pipeline.

mod orchestrator;
mod stats;

pub use orchestrator::{Session, SessionConfig};
pub use stats::RunStats;
