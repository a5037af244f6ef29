//! Fixed-timestep replay stepper implementation.

use std::collections::HashMap;

use contracts::{
    CanonicalEvent, EgoState, EntityId, EntityState, FrameMeta, StepPolicy, Vector3, WorldFrame,
};
use tracing::instrument;

use crate::accumulator::WindowAccumulator;

/// Stepper lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepState {
    /// Cursor at the first event, no frame produced yet
    AtRest,
    /// At least one frame produced, unconsumed events remain
    Advancing,
    /// Event stream fully consumed, terminal
    Exhausted,
}

/// Fixed-timestep replay stepper
///
/// Pulls canonical events off a sorted sequence one window at a time and
/// folds each window into a [`WorldFrame`]. Ego and entity states persist
/// across windows; detections and the collision flag are per-window.
#[derive(Debug)]
pub struct PlaybackStepper {
    /// Canonical events sorted by timestamp
    events: Vec<CanonicalEvent>,
    /// Index of the next unconsumed event
    cursor: usize,
    /// Per-kind aggregation policy
    policy: StepPolicy,
    /// Current state
    state: StepState,
    /// Replay clock (seconds of recorded flight time)
    now: f64,
    /// Timestamp of the first event, origin for elapsed time
    start_time: f64,
    /// Frame counter
    frame_counter: u64,
    /// Ego state carried across windows
    ego: EgoState,
    /// Entity states carried across windows
    entities: HashMap<EntityId, EntityState>,
}

impl PlaybackStepper {
    /// Create a stepper over a sorted event sequence
    ///
    /// An empty sequence yields a stepper that is exhausted from the start.
    pub fn new(events: Vec<CanonicalEvent>, policy: StepPolicy) -> Self {
        let (state, start_time) = match events.first() {
            Some(first) => (StepState::AtRest, first.timestamp),
            None => (StepState::Exhausted, 0.0),
        };

        Self {
            events,
            cursor: 0,
            policy,
            state,
            now: start_time,
            start_time,
            frame_counter: 0,
            ego: EgoState::default(),
            entities: HashMap::new(),
        }
    }

    /// Produce the next frame, or `None` once the event stream is exhausted
    #[instrument(
        level = "trace",
        name = "playback_advance",
        skip(self),
        fields(now = self.now, timestep)
    )]
    pub fn advance(&mut self, timestep: f64) -> Option<WorldFrame> {
        if self.state == StepState::Exhausted {
            return None;
        }

        let window_start = self.now;
        let deadline = self.now + timestep;
        let mut window = WindowAccumulator::new();

        loop {
            match self.events.get(self.cursor) {
                // The first event strictly past the deadline stays
                // unconsumed; it opens the next window and its timestamp
                // becomes the new clock. An event exactly at the deadline
                // belongs to the current window.
                Some(event) if event.timestamp > deadline => {
                    self.now = event.timestamp;
                    self.state = StepState::Advancing;
                    break;
                }
                Some(event) => {
                    window.fold(event);
                    self.cursor += 1;
                }
                // Stream exhausted mid-window: the clock stays where it was
                // and the partial window still becomes a frame.
                None => {
                    self.state = StepState::Exhausted;
                    break;
                }
            }
        }

        Some(self.finalize(window, window_start))
    }

    #[instrument(name = "playback_finalize", level = "trace", skip(self, window))]
    fn finalize(&mut self, mut window: WindowAccumulator, window_start: f64) -> WorldFrame {
        if window.ego.update_count() > 0 {
            let resolved = window.ego.resolve(self.policy.odometry);
            self.ego.position = resolved.position;
            self.ego.velocity = resolved.velocity;
            self.ego.speed = norm(resolved.velocity);
            self.ego.angular_velocity = resolved.angular_velocity;
            self.ego.angular_speed = resolved.angular_velocity.z;
            self.ego.attitude = resolved.attitude;
            self.ego.heading = resolved.attitude.yaw;
        }
        // Collision is momentary, not sticky.
        self.ego.collision = window.collision;

        for (entity_id, acc) in window.ground_truth.drain() {
            let (position, attitude) = acc.resolve(self.policy.ground_truth);
            self.entities.insert(
                entity_id,
                EntityState {
                    position,
                    attitude,
                    heading: attitude.yaw,
                },
            );
        }

        let detections = window.take_detections(self.policy.detections);

        self.frame_counter += 1;
        metrics::counter!("replay_frames_total").increment(1);
        metrics::histogram!("replay_window_events").record(f64::from(window.events_folded));

        WorldFrame {
            t_end: self.now,
            frame_id: self.frame_counter,
            elapsed: self.now - self.start_time,
            ego: self.ego.clone(),
            entities: self.entities.clone(),
            detections,
            meta: FrameMeta {
                window_start,
                events_folded: window.events_folded,
            },
        }
    }

    /// Current replay clock (seconds of recorded flight time)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Whether the event stream has been fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.state == StepState::Exhausted
    }

    /// Number of frames produced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Number of events not yet folded into a frame
    pub fn remaining_events(&self) -> usize {
        self.events.len() - self.cursor
    }
}

fn norm(v: Vector3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        Attitude, CollisionEvent, DetectionEvent, EventKind, GtPositionEvent, OdometryEvent,
    };

    fn odom_event(timestamp: f64, x: f64, vx: f64, yaw: f64) -> CanonicalEvent {
        CanonicalEvent {
            timestamp,
            kind: EventKind::Odometry(OdometryEvent {
                position: Vector3::new(x, 0.0, 0.0),
                attitude: Attitude::new(0.0, 0.0, yaw),
                velocity: Vector3::new(vx, 0.0, 0.0),
                angular_velocity: Vector3::new(0.1, 0.2, 0.3),
            }),
        }
    }

    fn gt_event(timestamp: f64, entity: &str, x: f64, yaw: f64) -> CanonicalEvent {
        CanonicalEvent {
            timestamp,
            kind: EventKind::GtPosition(GtPositionEvent {
                entity_id: EntityId::from(entity),
                position: Vector3::new(x, 0.0, 0.0),
                attitude: Attitude::new(0.0, 0.0, yaw),
            }),
        }
    }

    fn detection_event(timestamp: f64, entity: &str) -> CanonicalEvent {
        CanonicalEvent {
            timestamp,
            kind: EventKind::Detection(DetectionEvent {
                entity_id: EntityId::from(entity),
                position: Vector3::new(5.0, 0.0, 0.0),
                attitude: Attitude::default(),
                class: "car".to_owned(),
                color: "red".to_owned(),
                confidence: 0.9,
            }),
        }
    }

    fn collision_event(timestamp: f64) -> CanonicalEvent {
        CanonicalEvent {
            timestamp,
            kind: EventKind::Collision(CollisionEvent {
                object_name: "Cube_3".to_owned(),
                object_id: 7,
            }),
        }
    }

    #[test]
    fn test_empty_stream_is_exhausted_from_start() {
        let mut stepper = PlaybackStepper::new(Vec::new(), StepPolicy::default());

        assert!(stepper.is_exhausted());
        assert!(stepper.advance(0.1).is_none());
        assert_eq!(stepper.frame_count(), 0);
    }

    #[test]
    fn test_partial_final_frame_keeps_clock() {
        let events = vec![odom_event(0.0, 0.0, 1.0, 0.0), odom_event(0.05, 2.0, 1.0, 0.0)];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let frame = stepper.advance(0.1).unwrap();
        assert_eq!(frame.t_end, 0.0);
        assert_eq!(frame.elapsed, 0.0);
        assert_eq!(frame.meta.events_folded, 2);
        assert!(stepper.is_exhausted());

        assert!(stepper.advance(0.1).is_none());
    }

    #[test]
    fn test_boundary_event_opens_next_window() {
        let events = vec![
            odom_event(0.00, 0.0, 1.0, 0.0),
            odom_event(0.05, 2.0, 1.0, 0.0),
            odom_event(0.12, 4.0, 1.0, 0.0),
        ];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        // 0.12 > 0.0 + 0.1: it stays unconsumed and becomes the new clock.
        let first = stepper.advance(0.1).unwrap();
        assert_eq!(first.meta.events_folded, 2);
        assert_eq!(first.meta.window_start, 0.0);
        assert_eq!(first.t_end, 0.12);
        assert!((first.elapsed - 0.12).abs() < 1e-12);
        assert!(!stepper.is_exhausted());
        assert_eq!(stepper.remaining_events(), 1);

        // The held-back event is the sole member of the next window.
        let second = stepper.advance(0.1).unwrap();
        assert_eq!(second.meta.events_folded, 1);
        assert_eq!(second.meta.window_start, 0.12);
        assert_eq!(second.t_end, 0.12);
        assert!(stepper.is_exhausted());

        assert!(stepper.advance(0.1).is_none());
    }

    #[test]
    fn test_event_exactly_at_deadline_stays_in_current_window() {
        let events = vec![odom_event(0.0, 0.0, 1.0, 0.0), odom_event(0.1, 2.0, 1.0, 0.0)];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let frame = stepper.advance(0.1).unwrap();
        assert_eq!(frame.meta.events_folded, 2);
        assert!(stepper.is_exhausted());
    }

    #[test]
    fn test_ego_averaged_aggregation() {
        let events = vec![odom_event(0.0, 0.0, 3.0, 0.0), odom_event(0.05, 2.0, 5.0, 1.0)];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let frame = stepper.advance(0.1).unwrap();
        assert_eq!(frame.ego.position.x, 1.0);
        assert_eq!(frame.ego.velocity.x, 4.0);
        assert_eq!(frame.ego.speed, 4.0);
        assert_eq!(frame.ego.heading, 0.5);
        assert_eq!(frame.ego.angular_speed, frame.ego.angular_velocity.z);
    }

    #[test]
    fn test_three_odometry_samples_average_exactly() {
        let events = vec![
            odom_event(0.0, 0.0, 3.0, 0.0),
            odom_event(0.03, 1.0, 4.0, 0.0),
            odom_event(0.06, 2.0, 8.0, 0.0),
        ];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let frame = stepper.advance(0.1).unwrap();
        assert_eq!(frame.meta.events_folded, 3);
        assert_eq!(frame.ego.velocity.x, 5.0);
        assert_eq!(frame.ego.position.x, 1.0);
        assert_eq!(frame.ego.speed, 5.0);
    }

    #[test]
    fn test_ego_snapshot_policy_takes_last_observation() {
        let policy = StepPolicy {
            odometry: contracts::AggregationPolicy::Snapshot,
            ..StepPolicy::default()
        };
        let events = vec![odom_event(0.0, 0.0, 3.0, 0.0), odom_event(0.05, 2.0, 5.0, 1.0)];
        let mut stepper = PlaybackStepper::new(events, policy);

        let frame = stepper.advance(0.1).unwrap();
        assert_eq!(frame.ego.position.x, 2.0);
        assert_eq!(frame.ego.speed, 5.0);
        assert_eq!(frame.ego.heading, 1.0);
    }

    #[test]
    fn test_ego_state_carries_forward_without_updates() {
        let events = vec![odom_event(0.0, 3.0, 2.0, 0.4), gt_event(0.15, "envcar_1", 7.0, 0.0)];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let first = stepper.advance(0.1).unwrap();
        assert_eq!(first.ego.position.x, 3.0);

        // No odometry in the second window: ego is unchanged.
        let second = stepper.advance(0.1).unwrap();
        assert_eq!(second.meta.events_folded, 1);
        assert_eq!(second.ego.position.x, 3.0);
        assert_eq!(second.ego.speed, 2.0);
        assert_eq!(second.ego.heading, 0.4);
    }

    #[test]
    fn test_entities_carry_forward_without_updates() {
        let events = vec![
            gt_event(0.0, "envcar_1", 1.0, 0.2),
            gt_event(0.05, "envcar_1", 3.0, 0.4),
            odom_event(0.15, 0.0, 1.0, 0.0),
        ];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let first = stepper.advance(0.1).unwrap();
        let entity = &first.entities[&EntityId::from("envcar_1")];
        assert_eq!(entity.position.x, 2.0);
        assert!((entity.heading - 0.3).abs() < 1e-12);

        let second = stepper.advance(0.1).unwrap();
        let carried = &second.entities[&EntityId::from("envcar_1")];
        assert_eq!(carried.position.x, 2.0);
        assert!((carried.heading - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_collision_flag_is_momentary() {
        let events = vec![
            collision_event(0.0),
            odom_event(0.05, 0.0, 1.0, 0.0),
            odom_event(0.15, 1.0, 1.0, 0.0),
        ];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let first = stepper.advance(0.1).unwrap();
        assert!(first.ego.collision);

        let second = stepper.advance(0.1).unwrap();
        assert!(!second.ego.collision);
    }

    #[test]
    fn test_detections_belong_to_one_window_only() {
        let events = vec![
            detection_event(0.0, "envcar_1"),
            detection_event(0.05, "envcar_1"),
            odom_event(0.15, 0.0, 1.0, 0.0),
        ];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let first = stepper.advance(0.1).unwrap();
        assert_eq!(first.detections.len(), 2);
        assert_eq!(first.detections[0].timestamp, 0.0);

        let second = stepper.advance(0.1).unwrap();
        assert!(second.detections.is_empty());
    }

    #[test]
    fn test_elapsed_is_relative_to_first_event() {
        let events = vec![odom_event(100.0, 0.0, 1.0, 0.0), odom_event(100.25, 1.0, 1.0, 0.0)];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());
        assert_eq!(stepper.now(), 100.0);

        let first = stepper.advance(0.1).unwrap();
        assert_eq!(first.t_end, 100.25);
        assert!((first.elapsed - 0.25).abs() < 1e-9);

        let second = stepper.advance(0.1).unwrap();
        assert_eq!(second.t_end, 100.25);
    }

    #[test]
    fn test_frame_ids_increase_monotonically() {
        let events = vec![
            odom_event(0.0, 0.0, 1.0, 0.0),
            odom_event(0.15, 1.0, 1.0, 0.0),
            odom_event(0.3, 2.0, 1.0, 0.0),
        ];
        let mut stepper = PlaybackStepper::new(events, StepPolicy::default());

        let ids: Vec<u64> = std::iter::from_fn(|| stepper.advance(0.1))
            .map(|frame| frame.frame_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(stepper.frame_count(), 3);
    }
}
