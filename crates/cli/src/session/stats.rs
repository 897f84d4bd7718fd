//! Run statistics printed at the end of `fusion-tracker run`.

use std::time::Duration;

use contracts::SourceId;
use ingestion::MetricsSnapshot;
use pipeline::RunSummary;

/// Statistics from a finished session
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Wall time of the run
    pub duration: Duration,

    /// Per-source ingestion counters
    pub sources: Vec<(SourceId, MetricsSnapshot)>,

    pub summary: RunSummary,
}

impl RunStats {
    /// Synchronized pairs per wall-clock second
    pub fn pairs_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.summary.metrics.pairs as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Run Statistics                          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        let metrics = &self.summary.metrics;
        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Synchronized pairs: {}", metrics.pairs);
        println!("   ├─ Video-only frames: {}", metrics.video_only_frames);
        println!("   ├─ Pairs/s: {:.2}", self.pairs_per_sec());
        println!("   └─ Degraded at exit: {}", self.summary.health.degraded);

        println!("\n📷 Sources");
        for (i, (source_id, snapshot)) in self.sources.iter().enumerate() {
            let prefix = if i == self.sources.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {}: received={} evicted={} out_of_order={} rejected={}",
                prefix,
                source_id,
                snapshot.frames_received,
                snapshot.frames_evicted,
                snapshot.frames_out_of_order,
                snapshot.frames_rejected
            );
        }

        println!("\n📈 Sync & Latency");
        println!("   ├─ Pair Δt (ms): {}", metrics.pair_delta_ms);
        println!("   └─ Pipeline lag (ms): {}", metrics.pipeline_lag_ms);

        let counts = &self.summary.tracks.counts;
        println!("\n🚶 Tracks");
        println!("   ├─ New: {}", counts.new);
        println!("   ├─ Active: {}", counts.active);
        println!("   ├─ Idle: {}", counts.idle);
        println!("   └─ Lost (total): {}", counts.lost_total);

        println!("\n🔔 Events ({})", metrics.events_emitted);
        for (event_type, count) in &metrics.events_by_type {
            println!("   ├─ {}: {}", event_type, count);
        }

        let sinks = &self.summary.health.sinks;
        if !sinks.is_empty() {
            println!("\n📤 Sinks");
            for sink in sinks {
                println!(
                    "   ├─ {}: written={} failed={} dropped={}",
                    sink.name, sink.write_count, sink.failure_count, sink.dropped_count
                );
            }
        }

        println!();
    }
}
