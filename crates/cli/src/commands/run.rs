//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub fn run_replay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut mission = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(timestep) = args.timestep {
        anyhow::ensure!(timestep > 0.0, "--timestep must be positive");
        info!(timestep, "Overriding replay timestep from CLI");
        mission.replay.timestep_s = timestep;
    }

    info!(
        scenario = ?mission.replay.scenario_thread,
        topics = mission.subscribed_topics().len(),
        entities = mission.entities.len(),
        timestep = mission.replay.timestep_s,
        "Configuration loaded"
    );

    // Dry run - validate config and check the container exists, then exit
    if args.dry_run {
        if !args.bag.exists() {
            anyhow::bail!("Log container not found: {}", args.bag.display());
        }
        info!("Dry run mode - configuration is valid, exiting");
        print_mission_summary(&mission);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        bag_path: args.bag.clone(),
        timestep: mission.replay.timestep_s,
        max_frames: if args.max_frames == 0 {
            None
        } else {
            Some(args.max_frames)
        },
        export_path: args.export.clone(),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        mission,
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting replay...");

    let stats = pipeline.run().context("Replay execution failed")?;
    stats.print_summary();

    info!("Bag Replay finished");
    Ok(())
}

/// Print mission summary for dry-run mode
fn print_mission_summary(mission: &contracts::MissionConfig) {
    println!("\n=== Mission Summary ===\n");
    println!("Replay:");
    println!("  Scenario thread: {:?}", mission.replay.scenario_thread);
    println!("  Timestep: {}s", mission.replay.timestep_s);
    println!("  Aggregation: {:?}", mission.replay.aggregation);
    println!("  Pose tolerance: {}s", mission.replay.pose_time_tolerance_s);
    println!("  Debounce axis: {}m", mission.replay.debounce_axis_m);

    let topics = mission.subscribed_topics();
    println!("\nTopics ({}):", topics.len());
    for topic in &topics {
        println!("  - {}", topic);
    }

    if !mission.entities.is_empty() {
        println!("\nEntities ({}):", mission.entities.len());
        for entity in &mission.entities {
            println!("  - {} ({}, {})", entity.id, entity.class, entity.color);
        }
    }

    println!();
}
