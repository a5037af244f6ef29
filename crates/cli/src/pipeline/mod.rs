//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{collect_events, IngestReport, Pipeline, PipelineConfig};
pub use stats::ReplayStats;
