//! Topic 到通道角色的分发表

use std::collections::HashMap;

use contracts::{EntityId, MissionConfig};

/// 通道在归一化中的角色
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRole {
    /// Perception 检测通道
    Detection,
    /// 地面真值 perception 通道
    GroundTruth,
    /// 自机里程计通道
    Odometry,
    /// 碰撞状态通道
    Collision,
    /// 实体原始位姿通道
    EntityPose(EntityId),
}

/// topic → 角色 查找表
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    roles: HashMap<String, ChannelRole>,
}

impl RoleTable {
    /// Build the table from the mission topic configuration.
    ///
    /// Entity pose topics derive their entity id from the third
    /// slash-delimited path segment, e.g. `/airsim_node/envcar_1/pose`
    /// names `envcar_1`.
    pub fn from_config(config: &MissionConfig) -> Self {
        let topics = &config.topics;
        let mut roles = HashMap::new();
        roles.insert(topics.perception.clone(), ChannelRole::Detection);
        roles.insert(
            topics.ground_truth_perception.clone(),
            ChannelRole::GroundTruth,
        );
        roles.insert(topics.ego_odometry.clone(), ChannelRole::Odometry);
        roles.insert(topics.collision.clone(), ChannelRole::Collision);
        for topic in &topics.entity_poses {
            if let Some(entity) = entity_from_topic(topic) {
                roles.insert(topic.clone(), ChannelRole::EntityPose(entity));
            }
        }
        Self { roles }
    }

    /// 查询 topic 的角色；未订阅的 topic 返回 None
    pub fn role_of(&self, topic: &str) -> Option<&ChannelRole> {
        self.roles.get(topic)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// 从位姿 topic 提取实体 id（`/` 切分后的第 3 段）
pub fn entity_from_topic(topic: &str) -> Option<EntityId> {
    topic
        .split('/')
        .nth(2)
        .filter(|segment| !segment.is_empty())
        .map(EntityId::from)
}
