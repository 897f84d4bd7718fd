//! FrameSource trait - frame producer abstraction
//!
//! Decouples the ingestion pipeline from concrete acquisition code. Real
//! capture devices and the synthetic mock sources implement the same API.

use std::sync::Arc;

use crate::{SourceFrame, SourceKind};

/// Frame callback type
///
/// Invoked on the producer's own thread for every captured frame.
pub type FrameCallback = Arc<dyn Fn(SourceFrame) + Send + Sync>;

/// Frame source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn FrameSource> = make_source();
/// source.listen(Arc::new(|frame| {
///     println!("frame {} from {}", frame.sequence_no, frame.source_id);
/// }));
/// source.stop();
/// ```
pub trait FrameSource: Send + Sync {
    fn source_id(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Register the frame callback and start producing.
    ///
    /// Calling it again while listening is a no-op.
    fn listen(&self, callback: FrameCallback);

    /// Stop producing. Idempotent.
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
