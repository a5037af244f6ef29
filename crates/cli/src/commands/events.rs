//! `events` command implementation.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use contracts::{CanonicalEvent, EventKind};
use tracing::info;

use crate::cli::{EventsArgs, ExportFormat};
use crate::pipeline::collect_events;

/// Column layout shared by every event kind, unused columns stay empty.
const CSV_HEADER: &str = "Timestamp,Event,EntityID,PositionX,PositionY,PositionZ,Type,Color,\
                          Confidence,WorldX,WorldY,WorldZ,VelocityX,VelocityY,VelocityZ,Object,ObjectID";

/// Execute the `events` command
pub fn run_events(args: &EventsArgs) -> Result<()> {
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mission = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let report = collect_events(&mission, &args.bag)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    let result = match args.format {
        ExportFormat::Jsonl => write_jsonl(&mut writer, &report.events),
        ExportFormat::Csv => write_csv(&mut writer, &report.events),
    };
    observability::record_export_written(format_label(args.format), result.is_ok());
    result?;

    writer.flush().context("Failed to flush event output")?;

    let dropped = report.normalize.dropped_stale
        + report.normalize.dropped_unknown
        + report.normalize.dropped_malformed;
    info!(
        events = report.events.len(),
        dropped,
        format = format_label(args.format),
        "Events exported"
    );

    Ok(())
}

fn format_label(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Jsonl => "jsonl",
        ExportFormat::Csv => "csv",
    }
}

fn write_jsonl(writer: &mut dyn Write, events: &[CanonicalEvent]) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut *writer, event).context("Failed to serialize event")?;
        writer.write_all(b"\n").context("Failed to write event")?;
    }
    Ok(())
}

fn write_csv(writer: &mut dyn Write, events: &[CanonicalEvent]) -> Result<()> {
    writeln!(writer, "{}", CSV_HEADER).context("Failed to write CSV header")?;
    for event in events {
        writeln!(writer, "{}", csv_row(event)).context("Failed to write CSV row")?;
    }
    Ok(())
}

/// Render one event into the shared CSV column layout.
fn csv_row(event: &CanonicalEvent) -> String {
    let t = event.timestamp;
    match &event.kind {
        EventKind::GtPosition(gt) => format!(
            "{},GT_POSITION,{},{},{},{},,,,,,,,,,,",
            t, gt.entity_id, gt.position.x, gt.position.y, gt.position.z
        ),
        EventKind::Detection(det) => format!(
            "{},MSG,{},{},{},{},{},{},{},,,,,,,,",
            t,
            det.entity_id,
            det.position.x,
            det.position.y,
            det.position.z,
            det.class,
            det.color,
            det.confidence
        ),
        EventKind::Odometry(odom) => format!(
            "{},ODOM,,,,,,,,{},{},{},{},{},{},,",
            t,
            odom.position.x,
            odom.position.y,
            odom.position.z,
            odom.velocity.x,
            odom.velocity.y,
            odom.velocity.z
        ),
        EventKind::Collision(clsn) => format!(
            "{},CLSN,,,,,,,,,,,,,,{},{}",
            t, clsn.object_name, clsn.object_id
        ),
    }
}
