//! Playback aggregation policy contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

/// How events of one kind are folded into a replay window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Accumulate running sums and divide by the update count at window end
    Averaged,
    /// Keep observations verbatim: last-wins for state kinds, every
    /// observation individually for detections
    Snapshot,
}

/// Per-kind aggregation policy for the playback stepper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPolicy {
    /// Ground-truth entity position events
    #[serde(default = "default_averaged")]
    pub ground_truth: AggregationPolicy,

    /// Ego odometry events
    #[serde(default = "default_averaged")]
    pub odometry: AggregationPolicy,

    /// Reported detection events
    #[serde(default = "default_snapshot")]
    pub detections: AggregationPolicy,
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            ground_truth: AggregationPolicy::Averaged,
            odometry: AggregationPolicy::Averaged,
            detections: AggregationPolicy::Snapshot,
        }
    }
}

fn default_averaged() -> AggregationPolicy {
    AggregationPolicy::Averaged
}

fn default_snapshot() -> AggregationPolicy {
    AggregationPolicy::Snapshot
}
