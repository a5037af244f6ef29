//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::ReplayMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Total records read from the container on subscribed topics
    pub records_read: u64,

    /// Records successfully decoded into messages
    pub records_decoded: u64,

    /// Records skipped by the decode layer
    pub records_skipped: u64,

    /// Schema texts patched before parsing
    pub schema_patches: u64,

    /// Canonical events emitted by the normalizer
    pub events_emitted: u64,

    /// Events dropped by the normalizer (stale, unknown, malformed)
    pub events_dropped: u64,

    /// World frames produced by the stepper
    pub frames_produced: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Replay metrics aggregator
    pub replay_metrics: ReplayMetricsAggregator,
}

impl ReplayStats {
    /// Calculate frames per second throughput
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_produced as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate the fraction of read records that decoded cleanly
    pub fn decode_rate(&self) -> f64 {
        if self.records_read > 0 {
            self.records_decoded as f64 / self.records_read as f64
        } else {
            0.0
        }
    }

    /// Print a formatted summary of the statistics
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════╗");
        println!("║        Replay Statistics             ║");
        println!("╚══════════════════════════════════════╝");
        println!("📊 Overview:");
        println!("  ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  ├─ Records read: {}", self.records_read);
        println!(
            "  ├─ Records decoded: {} ({:.1}%)",
            self.records_decoded,
            self.decode_rate() * 100.0
        );
        println!("  ├─ Records skipped: {}", self.records_skipped);
        println!("  ├─ Schema patches: {}", self.schema_patches);
        println!("  ├─ Events emitted: {}", self.events_emitted);
        println!("  ├─ Events dropped: {}", self.events_dropped);
        println!("  ├─ Frames produced: {}", self.frames_produced);
        println!("  └─ Throughput: {:.2} frames/s", self.fps());

        let summary = self.replay_metrics.summary();
        println!("\n📈 Replay:");
        println!("  ├─ Replay span: {:.2}s", summary.replay_span_s);
        println!("  ├─ Entities tracked: {}", summary.entities_tracked);
        println!(
            "  ├─ Collision frames: {} ({:.2}%)",
            summary.collision_frames, summary.collision_rate
        );
        println!("  ├─ Detections: {}", summary.total_detections);
        println!("  ├─ Events per window: {}", summary.window_events);
        println!("  ├─ Ego speed (m/s): {}", summary.ego_speed);
        println!("  └─ Detection confidence: {}", summary.detection_confidence);

        if !summary.detection_counts.is_empty() {
            let mut counts: Vec<_> = summary.detection_counts.iter().collect();
            counts.sort_by(|a, b| a.0.cmp(b.0));
            println!("\n🔎 Detections per entity:");
            let last = counts.len() - 1;
            for (idx, (entity, count)) in counts.into_iter().enumerate() {
                let prefix = if idx == last { "└─" } else { "├─" };
                println!("  {} {}: {}", prefix, entity, count);
            }
        }
    }
}
