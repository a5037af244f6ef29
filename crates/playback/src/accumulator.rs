//! Per-window event folding.

use std::collections::HashMap;

use contracts::{
    AggregationPolicy, Attitude, CanonicalEvent, EntityId, EventKind, OdometryEvent,
    ReportedDetection, Vector3,
};

/// 向量分量累加和
#[derive(Debug, Clone, Copy, Default)]
struct VecSum {
    x: f64,
    y: f64,
    z: f64,
}

impl VecSum {
    fn add(&mut self, v: Vector3) {
        self.x += v.x;
        self.y += v.y;
        self.z += v.z;
    }

    fn mean(self, count: u32) -> Vector3 {
        if count == 0 {
            return Vector3::default();
        }
        let n = count as f64;
        Vector3::new(self.x / n, self.y / n, self.z / n)
    }
}

/// 姿态分量累加和
#[derive(Debug, Clone, Copy, Default)]
struct AttitudeSum {
    roll: f64,
    pitch: f64,
    yaw: f64,
}

impl AttitudeSum {
    fn add(&mut self, a: Attitude) {
        self.roll += a.roll;
        self.pitch += a.pitch;
        self.yaw += a.yaw;
    }

    fn mean(self, count: u32) -> Attitude {
        if count == 0 {
            return Attitude::default();
        }
        let n = count as f64;
        Attitude::new(self.roll / n, self.pitch / n, self.yaw / n)
    }
}

/// 单实体状态折叠器
#[derive(Debug, Clone, Default)]
pub(crate) struct StateAccumulator {
    position_sum: VecSum,
    attitude_sum: AttitudeSum,
    last_position: Vector3,
    last_attitude: Attitude,
    update_count: u32,
}

impl StateAccumulator {
    fn fold(&mut self, position: Vector3, attitude: Attitude) {
        self.position_sum.add(position);
        self.attitude_sum.add(attitude);
        self.last_position = position;
        self.last_attitude = attitude;
        self.update_count += 1;
    }

    pub(crate) fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Averaged 取均值，Snapshot 取最后一次观测
    pub(crate) fn resolve(&self, policy: AggregationPolicy) -> (Vector3, Attitude) {
        match policy {
            AggregationPolicy::Averaged => (
                self.position_sum.mean(self.update_count),
                self.attitude_sum.mean(self.update_count),
            ),
            AggregationPolicy::Snapshot => (self.last_position, self.last_attitude),
        }
    }
}

/// 自机状态折叠器
#[derive(Debug, Clone, Default)]
pub(crate) struct EgoAccumulator {
    state: StateAccumulator,
    velocity_sum: VecSum,
    angular_sum: VecSum,
    last_velocity: Vector3,
    last_angular: Vector3,
}

/// 自机窗口聚合结果
#[derive(Debug, Clone, Copy)]
pub(crate) struct EgoResolution {
    pub(crate) position: Vector3,
    pub(crate) attitude: Attitude,
    pub(crate) velocity: Vector3,
    pub(crate) angular_velocity: Vector3,
}

impl EgoAccumulator {
    fn fold(&mut self, odom: &OdometryEvent) {
        self.state.fold(odom.position, odom.attitude);
        self.velocity_sum.add(odom.velocity);
        self.angular_sum.add(odom.angular_velocity);
        self.last_velocity = odom.velocity;
        self.last_angular = odom.angular_velocity;
    }

    pub(crate) fn update_count(&self) -> u32 {
        self.state.update_count
    }

    pub(crate) fn resolve(&self, policy: AggregationPolicy) -> EgoResolution {
        let (position, attitude) = self.state.resolve(policy);
        let (velocity, angular_velocity) = match policy {
            AggregationPolicy::Averaged => (
                self.velocity_sum.mean(self.state.update_count),
                self.angular_sum.mean(self.state.update_count),
            ),
            AggregationPolicy::Snapshot => (self.last_velocity, self.last_angular),
        };
        EgoResolution {
            position,
            attitude,
            velocity,
            angular_velocity,
        }
    }
}

/// 单窗口折叠器；每个窗口都从零开始
#[derive(Debug, Default)]
pub(crate) struct WindowAccumulator {
    pub(crate) ground_truth: HashMap<EntityId, StateAccumulator>,
    pub(crate) ego: EgoAccumulator,
    detections: Vec<ReportedDetection>,
    pub(crate) collision: bool,
    pub(crate) events_folded: u32,
}

impl WindowAccumulator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fold(&mut self, event: &CanonicalEvent) {
        self.events_folded += 1;
        match &event.kind {
            EventKind::GtPosition(gt) => {
                self.ground_truth
                    .entry(gt.entity_id.clone())
                    .or_default()
                    .fold(gt.position, gt.attitude);
            }
            EventKind::Odometry(odom) => self.ego.fold(odom),
            EventKind::Detection(detection) => self.detections.push(ReportedDetection {
                timestamp: event.timestamp,
                entity_id: detection.entity_id.clone(),
                position: detection.position,
                attitude: detection.attitude,
                class: detection.class.clone(),
                color: detection.color.clone(),
                confidence: detection.confidence,
            }),
            EventKind::Collision(_) => self.collision = true,
        }
    }

    /// 按策略产出本窗口的检测列表
    pub(crate) fn take_detections(&mut self, policy: AggregationPolicy) -> Vec<ReportedDetection> {
        let detections = std::mem::take(&mut self.detections);
        match policy {
            AggregationPolicy::Snapshot => detections,
            AggregationPolicy::Averaged => average_detections(detections),
        }
    }
}

/// Reduce detections to one per entity: numeric fields are averaged,
/// class and color are last-write-wins, entities keep first-seen order.
fn average_detections(detections: Vec<ReportedDetection>) -> Vec<ReportedDetection> {
    let mut reduced: Vec<(EntityId, DetectionReduce)> = Vec::new();
    for detection in detections {
        match reduced.iter_mut().find(|(id, _)| *id == detection.entity_id) {
            Some((_, slot)) => slot.fold(detection),
            None => {
                let id = detection.entity_id.clone();
                let mut slot = DetectionReduce::default();
                slot.fold(detection);
                reduced.push((id, slot));
            }
        }
    }
    reduced
        .into_iter()
        .map(|(id, slot)| slot.finish(id))
        .collect()
}

#[derive(Debug, Default)]
struct DetectionReduce {
    position_sum: VecSum,
    attitude_sum: AttitudeSum,
    confidence_sum: f64,
    count: u32,
    timestamp: f64,
    class: String,
    color: String,
}

impl DetectionReduce {
    fn fold(&mut self, detection: ReportedDetection) {
        self.position_sum.add(detection.position);
        self.attitude_sum.add(detection.attitude);
        self.confidence_sum += detection.confidence;
        self.count += 1;
        self.timestamp = detection.timestamp;
        self.class = detection.class;
        self.color = detection.color;
    }

    fn finish(self, entity_id: EntityId) -> ReportedDetection {
        let n = self.count.max(1) as f64;
        ReportedDetection {
            timestamp: self.timestamp,
            entity_id,
            position: self.position_sum.mean(self.count),
            attitude: self.attitude_sum.mean(self.count),
            class: self.class,
            color: self.color,
            confidence: self.confidence_sum / n,
        }
    }
}
