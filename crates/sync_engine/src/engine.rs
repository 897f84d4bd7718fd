//! Frame synchronizer: owns one bounded buffer per source and turns them into
//! synchronized 2D/3D pairs.

use contracts::{
    ContractError, SourceFrame, SourceId, SourceKind, SourceSyncStats, SyncConfig, SyncQuality,
    SyncStats, SyncedPair,
};
use observability::RunningStats;
use tracing::{debug, instrument, trace, warn};

use crate::buffer::{FrameBuffer, PushOutcome};
use crate::matcher::{next_step, MatchStep, Side};

/// What happened to an ingested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Buffered,
    /// Buffered, the oldest frame of that source was evicted
    BufferedWithEviction,
    /// Late or duplicate frame, dropped
    DroppedOutOfOrder,
}

#[derive(Debug)]
struct SourceSlot {
    id: SourceId,
    kind: SourceKind,
    buffer: FrameBuffer,
    received: u64,
    dropped_stale: u64,
    paired: u64,
}

impl SourceSlot {
    fn new(id: SourceId, kind: SourceKind, capacity: usize) -> Self {
        Self {
            id,
            kind,
            buffer: FrameBuffer::new(capacity),
            received: 0,
            dropped_stale: 0,
            paired: 0,
        }
    }

    fn stats(&self) -> SourceSyncStats {
        SourceSyncStats {
            source_id: self.id.clone(),
            kind: Some(self.kind),
            buffer_depth: self.buffer.len(),
            capacity: self.buffer.capacity(),
            received: self.received,
            dropped_overflow: self.buffer.dropped_overflow(),
            dropped_stale: self.dropped_stale,
            dropped_out_of_order: self.buffer.dropped_out_of_order(),
            paired: self.paired,
            last_timestamp: self.buffer.last_timestamp(),
        }
    }

    fn discard_stale(&mut self, n: usize) {
        let removed = self.buffer.discard_front(n);
        if removed > 0 {
            self.dropped_stale += removed as u64;
            for _ in 0..removed {
                observability::record_frame_dropped(&self.id, "stale");
            }
        }
    }
}

/// Two-stream frame synchronizer (2D video + 3D depth).
///
/// Polled, never blocks: `next_pair` returns `None` as soon as no further pair
/// can be formed from what is buffered.
#[derive(Debug)]
pub struct FrameSynchronizer {
    config: SyncConfig,
    video: SourceSlot,
    depth: SourceSlot,
    /// First capture timestamp seen on any source
    started_at: Option<f64>,
    pairs_emitted: u64,
    video_only_emitted: u64,
    unknown_source_rejects: u64,
    delta_stats: RunningStats,
    last_quality: Option<SyncQuality>,
}

impl FrameSynchronizer {
    pub fn new(
        video_source_id: impl Into<SourceId>,
        depth_source_id: impl Into<SourceId>,
        config: SyncConfig,
    ) -> Self {
        let capacity = config.buffer_capacity;
        Self {
            video: SourceSlot::new(video_source_id.into(), SourceKind::Video, capacity),
            depth: SourceSlot::new(depth_source_id.into(), SourceKind::Depth, capacity),
            config,
            started_at: None,
            pairs_emitted: 0,
            video_only_emitted: 0,
            unknown_source_rejects: 0,
            delta_stats: RunningStats::default(),
            last_quality: None,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Enqueue a frame into its source's FIFO.
    ///
    /// # Errors
    /// `UnknownSource` for an id that is neither configured source and
    /// `PayloadMismatch` when the payload kind does not match the source.
    #[instrument(
        level = "trace",
        name = "sync_engine_ingest",
        skip(self, frame),
        fields(source_id = %frame.source_id, timestamp = frame.capture_timestamp)
    )]
    pub fn ingest(&mut self, frame: SourceFrame) -> Result<IngestOutcome, ContractError> {
        let kind = frame.kind();
        let slot = if frame.source_id == self.video.id {
            &mut self.video
        } else if frame.source_id == self.depth.id {
            &mut self.depth
        } else {
            self.unknown_source_rejects += 1;
            observability::record_frame_dropped(&frame.source_id, "unknown_source");
            return Err(ContractError::unknown_source(frame.source_id.as_str()));
        };
        if kind != slot.kind {
            return Err(ContractError::payload_mismatch(
                slot.id.as_str(),
                format!("expected {} frame, got {}", slot.kind, kind),
            ));
        }

        slot.received += 1;
        observability::record_frame_received(&slot.id, &kind.to_string());
        let timestamp = frame.capture_timestamp;

        let outcome = match slot.buffer.push(frame) {
            PushOutcome::Accepted => IngestOutcome::Buffered,
            PushOutcome::AcceptedWithEviction => {
                observability::record_frame_dropped(&slot.id, "overflow");
                debug!(source_id = %slot.id, "Buffer full, dropped oldest frame");
                IngestOutcome::BufferedWithEviction
            }
            PushOutcome::RejectedOutOfOrder => {
                observability::record_frame_dropped(&slot.id, "out_of_order");
                trace!(source_id = %slot.id, timestamp, "Late or duplicate frame dropped");
                return Ok(IngestOutcome::DroppedOutOfOrder);
            }
        };

        if self.started_at.is_none() {
            self.started_at = Some(timestamp);
        }
        Ok(outcome)
    }

    /// Produce the next synchronized pair, if one can be formed now.
    ///
    /// Matched frames and older frames preceding the match are removed; frames
    /// that can no longer match anything are discarded and counted as stale.
    #[instrument(level = "trace", name = "sync_engine_next_pair", skip(self))]
    pub fn next_pair(&mut self) -> Option<SyncedPair> {
        let tolerance = self.config.tolerance_sec();
        loop {
            let step = next_step(
                self.video.buffer.timestamps(),
                self.depth.buffer.timestamps(),
                tolerance,
            );
            match step {
                MatchStep::Wait => return None,
                MatchStep::Stale(Side::A) => self.video.discard_stale(1),
                MatchStep::Stale(Side::B) => self.depth.discard_stale(1),
                MatchStep::Pair {
                    a_index,
                    b_index,
                    delta,
                } => {
                    self.video.discard_stale(a_index);
                    self.depth.discard_stale(b_index);
                    let (Some(frame_2d), Some(frame_3d)) =
                        (self.video.buffer.pop_front(), self.depth.buffer.pop_front())
                    else {
                        warn!("Matched frame vanished from buffer");
                        return None;
                    };
                    return Some(self.emit_pair(frame_2d, frame_3d, delta));
                }
            }
        }
    }

    fn emit_pair(&mut self, frame_2d: SourceFrame, frame_3d: SourceFrame, delta: f64) -> SyncedPair {
        let quality = SyncQuality::grade(delta, self.config.tolerance_sec());
        self.video.paired += 1;
        self.depth.paired += 1;
        self.pairs_emitted += 1;
        self.delta_stats.push(delta * 1000.0);
        self.last_quality = Some(quality);
        observability::record_pair(delta * 1000.0, quality);

        debug!(
            t_2d = frame_2d.capture_timestamp,
            t_3d = frame_3d.capture_timestamp,
            delta_ms = delta * 1000.0,
            quality = quality.as_str(),
            "Synchronized pair"
        );

        SyncedPair {
            frame_2d,
            frame_3d,
            delta_t: delta,
            quality,
        }
    }

    /// Release the oldest 2D frame unpaired when depth is unavailable.
    ///
    /// Only when `video_only_fallback` is on, the depth buffer is empty and
    /// the newest 2D frame is more than `depth_unavailable_after_sec` past the
    /// newest depth frame (or past the start of the stream if no depth frame
    /// was ever seen).
    pub fn next_video_only(&mut self) -> Option<SourceFrame> {
        if !self.config.video_only_fallback
            || !self.depth.buffer.is_empty()
            || !self.is_depth_degraded()
        {
            return None;
        }
        let frame = self.video.buffer.pop_front()?;
        self.video_only_emitted += 1;
        observability::record_video_only_frame();
        trace!(timestamp = frame.capture_timestamp, "Depth unavailable, releasing 2D frame alone");
        Some(frame)
    }

    /// Whether depth looks unavailable for the newest 2D frame
    pub fn is_depth_degraded(&self) -> bool {
        let Some(newest_video) = self.video.buffer.last_timestamp() else {
            return false;
        };
        match self.depth.buffer.last_timestamp().or(self.started_at) {
            Some(reference) => newest_video - reference > self.config.depth_unavailable_after_sec,
            None => false,
        }
    }

    pub fn buffer_depth(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::Video => self.video.buffer.len(),
            SourceKind::Depth => self.depth.buffer.len(),
        }
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            sources: vec![self.video.stats(), self.depth.stats()],
            pairs_emitted: self.pairs_emitted,
            video_only_emitted: self.video_only_emitted,
            unknown_source_rejects: self.unknown_source_rejects,
            mean_delta_ms: self.delta_stats.mean(),
            max_delta_ms: self.delta_stats.max(),
            last_quality: self.last_quality,
        }
    }

    /// Empty both buffers; counters are kept.
    pub fn clear(&mut self) {
        self.video.buffer.clear();
        self.depth.buffer.clear();
    }

    pub fn reset_statistics(&mut self) {
        for slot in [&mut self.video, &mut self.depth] {
            slot.received = 0;
            slot.dropped_stale = 0;
            slot.paired = 0;
            slot.buffer.reset_counters();
        }
        self.pairs_emitted = 0;
        self.video_only_emitted = 0;
        self.unknown_source_rejects = 0;
        self.delta_stats = RunningStats::default();
        self.last_quality = None;
    }
}
