//! Canonical event normalization.

use std::collections::HashMap;

use contracts::{
    Attitude, CanonicalEvent, CollisionEvent, DetectionEvent, EntityConfig, EntityId, EventKind,
    GtPositionEvent, MessageValue, MissionConfig, OdometryEvent, ScenarioThread, Vector3,
};
use tracing::warn;

use crate::euler::quat_to_attitude;
use crate::pose_cache::{CachedPose, EntityPoseCache};
use crate::role::{ChannelRole, RoleTable};

/// 事件归一化器
///
/// 逐条消费解码后的消息，按通道角色产出规范事件。时间戳一律取
/// 消息自带的时间，不用落盘时间。
pub struct EventNormalizer {
    /// topic 分发表
    roles: RoleTable,
    /// 实体属性表（class / color）
    attributes: HashMap<EntityId, EntityConfig>,
    /// 实体位姿缓存
    pose_cache: EntityPoseCache,
    /// 任务线程类型
    scenario: ScenarioThread,
    /// 位姿相关性时间容差（秒）
    pose_time_tolerance: f64,
    /// 位姿去抖阈值（米，单轴）
    debounce_axis: f64,
    /// 已产出事件
    events: Vec<CanonicalEvent>,
    /// 相关性失败丢弃数
    dropped_stale: u64,
    /// 未配置实体丢弃数
    dropped_unknown: u64,
    /// 缺字段丢弃数
    dropped_malformed: u64,
}

/// 归一化统计
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeStats {
    /// 已产出事件数
    pub events_emitted: u64,

    /// 相关性失败丢弃数
    pub dropped_stale: u64,

    /// 未配置实体丢弃数
    pub dropped_unknown: u64,

    /// 缺字段丢弃数
    pub dropped_malformed: u64,
}

impl EventNormalizer {
    pub fn new(config: &MissionConfig) -> Self {
        Self {
            roles: RoleTable::from_config(config),
            attributes: config.entity_attribute_map(),
            pose_cache: EntityPoseCache::new(),
            scenario: config.replay.scenario_thread,
            pose_time_tolerance: config.replay.pose_time_tolerance_s,
            debounce_axis: config.replay.debounce_axis_m,
            events: Vec::new(),
            dropped_stale: 0,
            dropped_unknown: 0,
            dropped_malformed: 0,
        }
    }

    /// Feed one decoded message. Messages on unsubscribed topics are
    /// ignored.
    pub fn handle(&mut self, topic: &str, message: &MessageValue) {
        let Some(role) = self.roles.role_of(topic).cloned() else {
            return;
        };
        match role {
            ChannelRole::Detection => self.handle_detection(message),
            ChannelRole::GroundTruth => self.handle_ground_truth(message),
            ChannelRole::Odometry => self.handle_odometry(message),
            ChannelRole::Collision => self.handle_collision(message),
            ChannelRole::EntityPose(entity) => self.handle_entity_pose(&entity, message),
        }
    }

    /// Sort by timestamp and hand out the canonical sequence. The sort
    /// is stable, events at equal timestamps keep arrival order.
    pub fn finish(mut self) -> Vec<CanonicalEvent> {
        self.events
            .sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.events
    }

    /// 当前统计
    pub fn stats(&self) -> NormalizeStats {
        NormalizeStats {
            events_emitted: self.events.len() as u64,
            dropped_stale: self.dropped_stale,
            dropped_unknown: self.dropped_unknown,
            dropped_malformed: self.dropped_malformed,
        }
    }

    fn handle_detection(&mut self, message: &MessageValue) {
        // Maneuver missions withhold real detections entirely; the
        // ground-truth channel substitutes synthesized ones.
        if self.scenario == ScenarioThread::Maneuver {
            return;
        }
        let Some(timestamp) = message.field("detection_time").and_then(stamp_seconds) else {
            return self.drop_malformed("detection", "detection_time");
        };
        let Some(entity_id) = message.str_at("entity_id").map(EntityId::from) else {
            return self.drop_malformed("detection", "entity_id");
        };
        let Some(position) = message.at("position.position").and_then(vector3_of) else {
            return self.drop_malformed("detection", "position.position");
        };
        let Some(attitude) = message.at("position.orientation").and_then(attitude_of) else {
            return self.drop_malformed("detection", "position.orientation");
        };
        let Some(confidence) = message.f64_at("probability") else {
            return self.drop_malformed("detection", "probability");
        };
        let Some(attrs) = self.attributes.get(&entity_id) else {
            return self.drop_unknown(&entity_id);
        };

        let detection = DetectionEvent {
            entity_id,
            position,
            attitude,
            class: attrs.class.clone(),
            color: attrs.color.clone(),
            confidence,
        };
        self.push_event(CanonicalEvent {
            timestamp,
            kind: EventKind::Detection(detection),
        });
    }

    fn handle_ground_truth(&mut self, message: &MessageValue) {
        let Some(timestamp) = message.field("detection_time").and_then(stamp_seconds) else {
            return self.drop_malformed("ground_truth", "detection_time");
        };
        let Some(entity_id) = message.str_at("entity_id").map(EntityId::from) else {
            return self.drop_malformed("ground_truth", "entity_id");
        };
        let Some(enter_or_leave) = message.i64_at("enter_or_leave") else {
            return self.drop_malformed("ground_truth", "enter_or_leave");
        };
        let Some(confidence) = message.f64_at("probability") else {
            return self.drop_malformed("ground_truth", "probability");
        };

        // The report itself only carries the initial position; the real
        // one comes from the raw pose stream cached per entity.
        let Some(cached) = self.pose_cache.get(&entity_id).copied() else {
            return self.drop_stale(timestamp, &entity_id);
        };
        if (cached.timestamp - timestamp).abs() > self.pose_time_tolerance {
            return self.drop_stale(timestamp, &entity_id);
        }

        // Leave markers gate only this channel
        if enter_or_leave != 1 {
            self.push_event(CanonicalEvent {
                timestamp,
                kind: EventKind::GtPosition(GtPositionEvent {
                    entity_id: entity_id.clone(),
                    position: cached.position,
                    attitude: cached.attitude,
                }),
            });
        }

        // Maneuver missions mirror every correlated report as a
        // synthesized detection, not gated by the leave marker
        if self.scenario == ScenarioThread::Maneuver {
            let Some(attrs) = self.attributes.get(&entity_id) else {
                return self.drop_unknown(&entity_id);
            };
            let detection = DetectionEvent {
                entity_id,
                position: cached.position,
                attitude: cached.attitude,
                class: attrs.class.clone(),
                color: attrs.color.clone(),
                confidence,
            };
            self.push_event(CanonicalEvent {
                timestamp,
                kind: EventKind::Detection(detection),
            });
        }
    }

    fn handle_odometry(&mut self, message: &MessageValue) {
        let Some(timestamp) = message.at("header.stamp").and_then(stamp_seconds) else {
            return self.drop_malformed("odometry", "header.stamp");
        };
        let Some(position) = message.at("pose.pose.position").and_then(vector3_of) else {
            return self.drop_malformed("odometry", "pose.pose.position");
        };
        let Some(attitude) = message.at("pose.pose.orientation").and_then(attitude_of) else {
            return self.drop_malformed("odometry", "pose.pose.orientation");
        };
        let Some(velocity) = message.at("twist.twist.linear").and_then(vector3_of) else {
            return self.drop_malformed("odometry", "twist.twist.linear");
        };
        let Some(angular_velocity) = message.at("twist.twist.angular").and_then(vector3_of) else {
            return self.drop_malformed("odometry", "twist.twist.angular");
        };

        self.push_event(CanonicalEvent {
            timestamp,
            kind: EventKind::Odometry(OdometryEvent {
                position,
                attitude,
                velocity,
                angular_velocity,
            }),
        });
    }

    fn handle_collision(&mut self, message: &MessageValue) {
        let Some(has_collided) = message.bool_at("has_collided") else {
            return self.drop_malformed("collision", "has_collided");
        };
        // false flags are heartbeat traffic
        if !has_collided {
            return;
        }
        let Some(timestamp) = message.field("timestamp").and_then(stamp_seconds) else {
            return self.drop_malformed("collision", "timestamp");
        };
        let Some(object_name) = message.str_at("object_name").map(str::to_owned) else {
            return self.drop_malformed("collision", "object_name");
        };
        let Some(object_id) = message.i64_at("object_id") else {
            return self.drop_malformed("collision", "object_id");
        };

        self.push_event(CanonicalEvent {
            timestamp,
            kind: EventKind::Collision(CollisionEvent {
                object_name,
                object_id,
            }),
        });
    }

    fn handle_entity_pose(&mut self, entity: &EntityId, message: &MessageValue) {
        if !self.attributes.contains_key(entity) {
            warn!(entity = %entity, "pose update for unconfigured entity, skipping");
            self.dropped_unknown += 1;
            metrics::counter!("normalize_events_dropped_total", "reason" => "unknown_entity")
                .increment(1);
            return;
        }
        let Some(timestamp) = message.at("header.stamp").and_then(stamp_seconds) else {
            return self.drop_malformed("entity_pose", "header.stamp");
        };
        let Some(position) = message.at("pose.position").and_then(vector3_of) else {
            return self.drop_malformed("entity_pose", "pose.position");
        };
        let Some(attitude) = message.at("pose.orientation").and_then(attitude_of) else {
            return self.drop_malformed("entity_pose", "pose.orientation");
        };

        let pose = CachedPose {
            timestamp,
            position,
            attitude,
        };
        let moved = self.pose_cache.update(entity, pose, self.debounce_axis);
        if moved {
            self.push_event(CanonicalEvent {
                timestamp,
                kind: EventKind::GtPosition(GtPositionEvent {
                    entity_id: entity.clone(),
                    position,
                    attitude,
                }),
            });
        }
    }

    fn push_event(&mut self, event: CanonicalEvent) {
        metrics::counter!("normalize_events_total", "kind" => event.kind.label()).increment(1);
        self.events.push(event);
    }

    fn drop_stale(&mut self, timestamp: f64, entity: &EntityId) {
        warn!(
            entity = %entity,
            timestamp,
            "no valid pose data for ground truth report, not reporting"
        );
        self.dropped_stale += 1;
        metrics::counter!("normalize_events_dropped_total", "reason" => "stale_pose").increment(1);
    }

    fn drop_unknown(&mut self, entity: &EntityId) {
        warn!(entity = %entity, "report for unconfigured entity, dropping");
        self.dropped_unknown += 1;
        metrics::counter!("normalize_events_dropped_total", "reason" => "unknown_entity")
            .increment(1);
    }

    fn drop_malformed(&mut self, channel: &'static str, field: &'static str) {
        warn!(channel, field, "message is missing a required field, dropping");
        self.dropped_malformed += 1;
        metrics::counter!("normalize_events_dropped_total", "reason" => "malformed").increment(1);
    }
}

/// `{sec, nanosec}` 结构转秒
fn stamp_seconds(value: &MessageValue) -> Option<f64> {
    let sec = value.i64_at("sec")? as f64;
    let nanosec = value.i64_at("nanosec")? as f64;
    Some(sec + nanosec / 1e9)
}

fn vector3_of(value: &MessageValue) -> Option<Vector3> {
    Some(Vector3::new(
        value.f64_at("x")?,
        value.f64_at("y")?,
        value.f64_at("z")?,
    ))
}

fn attitude_of(value: &MessageValue) -> Option<Attitude> {
    let x = value.f64_at("x")?;
    let y = value.f64_at("y")?;
    let z = value.f64_at("z")?;
    let w = value.f64_at("w")?;
    Some(quat_to_attitude(x, y, z, w))
}
