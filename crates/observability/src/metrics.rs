//! 流水线指标收集模块
//!
//! `metrics` facade helpers for every stage plus an in-memory aggregator used
//! for the end-of-run summary.

use std::collections::BTreeMap;

use contracts::{EventType, HealthSnapshot, SyncQuality, TrackCounts};
use metrics::{counter, gauge, histogram};

/// 记录帧接收
pub fn record_frame_received(source_id: &str, kind: &str) {
    counter!(
        "fusion_tracker_frames_received_total",
        "source_id" => source_id.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// 记录帧丢弃 (reason: overflow / stale / out_of_order / unknown_source)
pub fn record_frame_dropped(source_id: &str, reason: &'static str) {
    counter!(
        "fusion_tracker_frames_dropped_total",
        "source_id" => source_id.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录同步对
pub fn record_pair(delta_ms: f64, quality: SyncQuality) {
    counter!("fusion_tracker_pairs_total", "quality" => quality.as_str()).increment(1);
    histogram!("fusion_tracker_pair_delta_ms").record(delta_ms);
}

/// 记录仅 2D 帧 (降级模式)
pub fn record_video_only_frame() {
    counter!("fusion_tracker_video_only_frames_total").increment(1);
}

/// 记录融合结果
pub fn record_observations(total: usize, with_position: usize) {
    counter!("fusion_tracker_observations_total").increment(total as u64);
    counter!("fusion_tracker_observations_without_depth_total")
        .increment(total.saturating_sub(with_position) as u64);
}

/// 记录跟踪数量
pub fn record_track_counts(counts: &TrackCounts) {
    gauge!("fusion_tracker_tracks", "state" => "new").set(counts.new as f64);
    gauge!("fusion_tracker_tracks", "state" => "active").set(counts.active as f64);
    gauge!("fusion_tracker_tracks", "state" => "idle").set(counts.idle as f64);
    gauge!("fusion_tracker_tracks_lost_total").set(counts.lost_total as f64);
}

/// 记录事件产生
pub fn record_event_emitted(event_type: EventType) {
    counter!(
        "fusion_tracker_events_total",
        "type" => event_type.as_str()
    )
    .increment(1);
}

/// 记录事件分发
pub fn record_event_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "fusion_tracker_events_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录流水线延迟 (采集时间到处理完成)
pub fn record_pipeline_lag_ms(lag_ms: f64) {
    histogram!("fusion_tracker_pipeline_lag_ms").record(lag_ms);
    gauge!("fusion_tracker_pipeline_lag_ms_current").set(lag_ms);
}

/// 记录缓冲区深度
pub fn record_buffer_depth(source_id: &str, depth: usize) {
    gauge!(
        "fusion_tracker_buffer_depth",
        "source_id" => source_id.to_string()
    )
    .set(depth as f64);
}

/// 发布完整健康快照
pub fn record_health(snapshot: &HealthSnapshot) {
    for source in &snapshot.sources {
        record_buffer_depth(&source.source_id, source.buffer_depth);
        gauge!(
            "fusion_tracker_frames_dropped_current",
            "source_id" => source.source_id.to_string()
        )
        .set(source.dropped_total() as f64);
    }
    record_track_counts(&snapshot.tracks);
    gauge!("fusion_tracker_degraded").set(if snapshot.degraded { 1.0 } else { 0.0 });
    for sink in &snapshot.sinks {
        gauge!("fusion_tracker_sink_queue_len", "sink" => sink.name.clone())
            .set(sink.queue_len as f64);
        gauge!("fusion_tracker_sink_dropped", "sink" => sink.name.clone())
            .set(sink.dropped_count as f64);
    }
}

/// 运行期健康聚合器
///
/// Keeps the latest snapshot plus running distributions for the summary
/// printed when a run ends.
#[derive(Debug, Clone, Default)]
pub struct HealthAggregator {
    latest: Option<HealthSnapshot>,
    delta_stats: RunningStats,
    lag_stats: RunningStats,
    events_by_type: BTreeMap<EventType, u64>,
}

impl HealthAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pair_delta(&mut self, delta_sec: f64) {
        self.delta_stats.push(delta_sec * 1000.0);
    }

    pub fn record_event(&mut self, event_type: EventType) {
        *self.events_by_type.entry(event_type).or_insert(0) += 1;
    }

    pub fn update(&mut self, snapshot: &HealthSnapshot) {
        self.lag_stats.push(snapshot.pipeline_lag_ms);
        self.latest = Some(snapshot.clone());
    }

    pub fn latest(&self) -> Option<&HealthSnapshot> {
        self.latest.as_ref()
    }

    pub fn summary(&self) -> MetricsSummary {
        let latest = self.latest.clone().unwrap_or_default();
        let received: u64 = latest.sources.iter().map(|s| s.received).sum();
        let dropped = latest.total_dropped_frames();
        MetricsSummary {
            pairs: latest.pairs_processed,
            video_only_frames: latest.video_only_processed,
            frames_received: received,
            frames_dropped: dropped,
            drop_rate: if received > 0 {
                dropped as f64 / received as f64 * 100.0
            } else {
                0.0
            },
            tracks: latest.tracks,
            events_emitted: latest.events_emitted,
            events_by_type: self.events_by_type.clone(),
            pair_delta_ms: StatsSummary::from(&self.delta_stats),
            pipeline_lag_ms: StatsSummary::from(&self.lag_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub pairs: u64,
    pub video_only_frames: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub drop_rate: f64,
    pub tracks: TrackCounts,
    pub events_emitted: u64,
    pub events_by_type: BTreeMap<EventType, u64>,
    pub pair_delta_ms: StatsSummary,
    pub pipeline_lag_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Pipeline Metrics Summary ===")?;
        writeln!(f, "Synchronized pairs: {}", self.pairs)?;
        writeln!(f, "Video-only frames: {}", self.video_only_frames)?;
        writeln!(
            f,
            "Frames dropped: {} of {} ({:.2}%)",
            self.frames_dropped, self.frames_received, self.drop_rate
        )?;
        writeln!(
            f,
            "Tracks: new={} active={} idle={} lost_total={}",
            self.tracks.new, self.tracks.active, self.tracks.idle, self.tracks.lost_total
        )?;
        writeln!(f, "Pair delta (ms): {}", self.pair_delta_ms)?;
        writeln!(f, "Pipeline lag (ms): {}", self.pipeline_lag_ms)?;
        writeln!(f, "Events emitted: {}", self.events_emitted)?;
        for (event_type, count) in &self.events_by_type {
            writeln!(f, "  {}: {}", event_type, count)?;
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford)
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkHealth, SourceSyncStats};

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_empty_stats_display() {
        let summary = StatsSummary::from(&RunningStats::default());
        assert_eq!(summary.to_string(), "N/A");
    }

    #[test]
    fn test_aggregator_summary() {
        let mut aggregator = HealthAggregator::new();
        aggregator.record_pair_delta(0.02);
        aggregator.record_pair_delta(0.04);
        aggregator.record_event(EventType::NewObject);
        aggregator.record_event(EventType::NewObject);
        aggregator.record_event(EventType::Idle);

        aggregator.update(&HealthSnapshot {
            sources: vec![
                SourceSyncStats {
                    source_id: "video-01".into(),
                    received: 90,
                    dropped_stale: 5,
                    ..Default::default()
                },
                SourceSyncStats {
                    source_id: "depth-01".into(),
                    received: 10,
                    dropped_overflow: 5,
                    ..Default::default()
                },
            ],
            pairs_processed: 80,
            events_emitted: 3,
            pipeline_lag_ms: 12.0,
            sinks: vec![SinkHealth {
                name: "log".into(),
                ..Default::default()
            }],
            ..Default::default()
        });

        let summary = aggregator.summary();
        assert_eq!(summary.pairs, 80);
        assert_eq!(summary.frames_received, 100);
        assert_eq!(summary.frames_dropped, 10);
        assert!((summary.drop_rate - 10.0).abs() < 1e-9);
        assert_eq!(summary.events_by_type.get(&EventType::NewObject), Some(&2));
        assert!((summary.pair_delta_ms.mean - 30.0).abs() < 1e-9);
        assert!(summary.to_string().contains("Synchronized pairs: 80"));
    }
}
