//! `info` command implementation.

use anyhow::{Context, Result};
use ingestion::{resolve_bag_path, BagReader, ChannelInfo};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Container info for JSON output
#[derive(Serialize)]
struct ContainerInfo {
    bag_path: String,
    size_bytes: u64,
    channel_count: usize,
    message_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_log_time_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_log_time_ns: Option<u64>,
    channels: Vec<ChannelInfo>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(bag = %args.bag.display(), "Inspecting log container");

    let resolved = resolve_bag_path(&args.bag)
        .with_context(|| format!("Failed to locate log in {}", args.bag.display()))?;

    let reader = BagReader::open(&resolved)
        .with_context(|| format!("Failed to open {}", resolved.display()))?;
    let channels = reader.channel_summary()?;

    let size_bytes = std::fs::metadata(&resolved)
        .with_context(|| format!("Failed to stat {}", resolved.display()))?
        .len();

    let container = build_container_info(&resolved, size_bytes, channels);

    if args.json {
        let json =
            serde_json::to_string_pretty(&container).context("Failed to serialize container info")?;
        println!("{}", json);
    } else {
        print_container_info(&container);
    }

    Ok(())
}

fn build_container_info(
    path: &std::path::Path,
    size_bytes: u64,
    channels: Vec<ChannelInfo>,
) -> ContainerInfo {
    let message_count: u64 = channels.iter().map(|c| c.message_count).sum();

    // Empty channels report zeroed timestamps, exclude them from the span.
    let first_log_time_ns = channels
        .iter()
        .filter(|c| c.message_count > 0)
        .map(|c| c.first_log_time_ns)
        .min();
    let last_log_time_ns = channels
        .iter()
        .filter(|c| c.message_count > 0)
        .map(|c| c.last_log_time_ns)
        .max();

    ContainerInfo {
        bag_path: path.display().to_string(),
        size_bytes,
        channel_count: channels.len(),
        message_count,
        first_log_time_ns,
        last_log_time_ns,
        channels,
    }
}

fn print_container_info(container: &ContainerInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Log Container Information                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Container overview
    println!("📦 Container");
    println!("   ├─ Path: {}", container.bag_path);
    println!(
        "   ├─ Size: {:.2} MiB",
        container.size_bytes as f64 / (1024.0 * 1024.0)
    );
    println!("   ├─ Channels: {}", container.channel_count);
    println!("   ├─ Messages: {}", container.message_count);
    match (container.first_log_time_ns, container.last_log_time_ns) {
        (Some(first), Some(last)) => {
            println!(
                "   └─ Log span: {:.2}s",
                last.saturating_sub(first) as f64 / 1e9
            );
        }
        _ => {
            println!("   └─ Log span: (empty)");
        }
    }

    // Channels
    println!("\n📡 Channels ({})", container.channels.len());
    for (i, channel) in container.channels.iter().enumerate() {
        let is_last = i == container.channels.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({} messages)",
            prefix, channel.topic, channel.message_count
        );
        println!(
            "   {}  ├─ Schema: {} ({})",
            child_prefix, channel.schema_name, channel.schema_encoding
        );
        println!(
            "   {}  └─ Encoding: {}",
            child_prefix, channel.message_encoding
        );
    }

    println!();
}
