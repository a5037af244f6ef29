//! WorldFrame - Playback Stepper output
//!
//! Aggregated world-state snapshot for one replay window.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Attitude, EntityId, Vector3};

/// World-state frame
///
/// Contains the aggregated ego and entity states for one replay window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldFrame {
    /// Window end timestamp (recorded flight time, seconds)
    pub t_end: f64,

    /// Frame sequence number (monotonically increasing)
    pub frame_id: u64,

    /// Elapsed time since replay start (seconds)
    pub elapsed: f64,

    /// Ego vehicle state
    pub ego: EgoState,

    /// Ground-truth entity states (entity_id -> state), carried forward
    /// across windows without updates
    pub entities: HashMap<EntityId, EntityState>,

    /// Detections reported within this window only
    pub detections: Vec<ReportedDetection>,

    /// Frame metadata
    pub meta: FrameMeta,
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameMeta {
    /// Window start timestamp (seconds)
    pub window_start: f64,

    /// Number of events folded into this frame
    pub events_folded: u32,
}

/// Aggregated ego state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EgoState {
    /// Position (meters)
    pub position: Vector3,

    /// Linear velocity (m/s)
    pub velocity: Vector3,

    /// Speed (m/s), norm of velocity
    pub speed: f64,

    /// Angular velocity (rad/s)
    pub angular_velocity: Vector3,

    /// Angular speed (rad/s), z component of angular velocity
    pub angular_speed: f64,

    /// Attitude (radians)
    pub attitude: Attitude,

    /// Heading (radians), equals yaw
    pub heading: f64,

    /// Collision observed in this window (reset every window)
    pub collision: bool,
}

/// Aggregated ground-truth entity state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Position (meters)
    pub position: Vector3,

    /// Attitude (radians)
    pub attitude: Attitude,

    /// Heading (radians), equals yaw
    pub heading: f64,
}

/// Detection reported within a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedDetection {
    /// Detection timestamp (seconds)
    pub timestamp: f64,

    /// Entity ID
    pub entity_id: EntityId,

    /// Reported position (meters)
    pub position: Vector3,

    /// Reported attitude (radians)
    pub attitude: Attitude,

    /// Entity class
    pub class: String,

    /// Entity color
    pub color: String,

    /// Detection confidence (0-1)
    pub confidence: f64,
}
