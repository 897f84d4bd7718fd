//! # Contracts
//!
//! Frozen interface contracts shared by every pipeline stage: frames, synced
//! pairs, fused observations, track lifecycle notices, events, zones, sinks and
//! configuration. All business crates depend on this crate, never the reverse.
//!
//! ## Time Model
//! - Capture timestamps are seconds since the Unix epoch (`f64`)
//! - Conversion to `chrono::DateTime<Utc>` happens only on the [`Event`] boundary

mod blueprint;
mod error;
mod event;
mod frame;
mod geometry;
mod health;
mod observation;
mod sink;
mod source;
mod source_id;
mod sync;
mod track;
mod zone;

pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use frame::*;
pub use geometry::*;
pub use health::*;
pub use observation::*;
pub use sink::*;
pub use source::{FrameCallback, FrameSource};
pub use source_id::SourceId;
pub use sync::*;
pub use track::*;
pub use zone::*;
