//! Pipeline orchestrator - wires ingestion, normalization and stepping.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{CanonicalEvent, MissionConfig, WorldFrame};
use ingestion::{resolve_bag_path, BagReader, DecodeStatsSnapshot, DecoderSet};
use normalizer::{EventNormalizer, NormalizeStats};
use observability::record_frame_metrics;
use playback::PlaybackStepper;
use tracing::{debug, info};

use super::ReplayStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The mission configuration
    pub mission: MissionConfig,

    /// Path to the recorded log container
    pub bag_path: PathBuf,

    /// Replay timestep in seconds
    pub timestep: f64,

    /// Maximum number of frames to produce (None = unlimited)
    pub max_frames: Option<u64>,

    /// Frame export path, JSON lines (None = disabled)
    pub export_path: Option<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Ingest-and-normalize outcome shared by `run` and `events`
pub struct IngestReport {
    /// Canonical event sequence, sorted by timestamp
    pub events: Vec<CanonicalEvent>,

    /// Records read from the container on subscribed topics
    pub records_read: u64,

    /// Decode-layer counters
    pub decode: DecodeStatsSnapshot,

    /// Normalizer-layer counters
    pub normalize: NormalizeStats,
}

/// Read the whole container and produce the canonical event sequence.
pub fn collect_events(mission: &MissionConfig, bag_path: &Path) -> Result<IngestReport> {
    let resolved = resolve_bag_path(bag_path)
        .with_context(|| format!("Failed to locate log in {}", bag_path.display()))?;
    info!(bag = %resolved.display(), "Opening log container");

    let reader = BagReader::open(&resolved)
        .with_context(|| format!("Failed to open {}", resolved.display()))?;

    let topics = mission.subscribed_topics();
    let mut decoders = DecoderSet::new(mission.topics.perception.clone());
    let mut normalizer = EventNormalizer::new(mission);
    let mut records_read = 0u64;

    for record in reader.records_on_topics(&topics)? {
        let record = record.context("Failed to read a record from the container")?;
        records_read += 1;
        observability::record_record_read(&record.channel.topic);

        if let Some(message) = decoders.decode(&record)? {
            normalizer.handle(&record.channel.topic, &message);
        }
    }

    let decode = decoders.stats().snapshot();
    let normalize = normalizer.stats();
    let events = normalizer.finish();

    info!(
        records = records_read,
        decoded = decode.records_decoded,
        skipped = decode.records_skipped,
        events = events.len(),
        "Canonical event sequence ready"
    );

    Ok(IngestReport {
        events,
        records_read,
        decode,
        normalize,
    })
}

/// Main replay pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline to completion
    pub fn run(self) -> Result<ReplayStats> {
        let start_time = Instant::now();

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let report = collect_events(&self.config.mission, &self.config.bag_path)?;

        let mut exporter = match &self.config.export_path {
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("Failed to create export file {}", path.display())
                })?;
                info!(path = %path.display(), "Exporting frames as JSON lines");
                Some(BufWriter::new(file))
            }
            None => None,
        };

        let mut stats = ReplayStats {
            records_read: report.records_read,
            records_decoded: report.decode.records_decoded,
            records_skipped: report.decode.records_skipped,
            schema_patches: report.decode.schema_patches,
            events_emitted: report.normalize.events_emitted,
            events_dropped: report.normalize.dropped_stale
                + report.normalize.dropped_unknown
                + report.normalize.dropped_malformed,
            ..Default::default()
        };

        let mut stepper = PlaybackStepper::new(report.events, self.config.mission.replay.aggregation);

        info!(
            timestep = self.config.timestep,
            max_frames = ?self.config.max_frames,
            "Stepping replay"
        );

        loop {
            let step_start = Instant::now();
            let Some(frame) = stepper.advance(self.config.timestep) else {
                break;
            };
            observability::record_step_duration_ms(step_start.elapsed().as_secs_f64() * 1000.0);

            record_frame_metrics(&frame);
            stats.replay_metrics.update(&frame);
            stats.frames_produced += 1;

            debug!(
                frame_id = frame.frame_id,
                t_end = format!("{:.3}", frame.t_end),
                events = frame.meta.events_folded,
                entities = frame.entities.len(),
                detections = frame.detections.len(),
                collision = frame.ego.collision,
                "Frame produced"
            );

            if let Some(writer) = exporter.as_mut() {
                let written = write_frame(writer, &frame);
                observability::record_export_written("jsonl", written.is_ok());
                written?;
            }

            if let Some(max) = self.config.max_frames {
                if stats.frames_produced >= max {
                    info!(frames = stats.frames_produced, "Reached max frames limit");
                    break;
                }
            }
        }

        if let Some(mut writer) = exporter {
            writer.flush().context("Failed to flush export file")?;
        }

        if !stepper.is_exhausted() {
            debug!(
                remaining = stepper.remaining_events(),
                "Stopped with events left unfolded"
            );
        }

        stats.duration = start_time.elapsed();

        info!(
            frames = stats.frames_produced,
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Replay complete"
        );

        Ok(stats)
    }
}

fn write_frame(writer: &mut BufWriter<File>, frame: &WorldFrame) -> Result<()> {
    serde_json::to_writer(&mut *writer, frame).context("Failed to serialize frame")?;
    writer.write_all(b"\n").context("Failed to write frame")?;
    Ok(())
}
