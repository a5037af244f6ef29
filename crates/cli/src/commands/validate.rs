//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    scenario_thread: String,
    topic_count: usize,
    entity_count: usize,
    timestep_s: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(mission) => {
            let warnings = collect_warnings(&mission);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", mission.version),
                    scenario_thread: format!("{:?}", mission.replay.scenario_thread),
                    topic_count: mission.subscribed_topics().len(),
                    entity_count: mission.entities.len(),
                    timestep_s: mission.replay.timestep_s,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(mission: &contracts::MissionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    // Check for empty entity list
    if mission.entities.is_empty() {
        warnings.push(
            "No entities configured - perception reports cannot be attributed and will be dropped"
                .to_string(),
        );
    }

    // Check for missing pose topics
    if mission.topics.entity_poses.is_empty() {
        warnings.push(
            "No entity pose topics configured - ground-truth reports cannot be correlated"
                .to_string(),
        );
    }

    // Check pose topics against the entity list
    for topic in &mission.topics.entity_poses {
        match normalizer::entity_from_topic(topic) {
            Some(entity) => {
                if !mission.entities.iter().any(|e| entity == e.id) {
                    warnings.push(format!(
                        "Pose topic '{}' names entity '{}' which is not in [[entities]]",
                        topic, entity
                    ));
                }
            }
            None => {
                warnings.push(format!(
                    "Pose topic '{}' has no entity segment (expected /<node>/<entity>/pose)",
                    topic
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Scenario thread: {}", summary.scenario_thread);
            println!("  Topics: {}", summary.topic_count);
            println!("  Entities: {}", summary.entity_count);
            println!("  Timestep: {}s", summary.timestep_s);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
