//! MissionConfig - Config Loader 输出
//!
//! 描述完整的回放任务配置：通道话题、实体属性、回放策略。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{EntityId, StepPolicy};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的回放任务配置
///
/// 构造一次后以引用传入各组件，不使用全局状态。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 通道话题配置
    #[serde(default)]
    pub topics: TopicConfig,

    /// 关注实体列表
    #[serde(default)]
    pub entities: Vec<EntityConfig>,

    /// 回放策略配置
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// 通道话题配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// 感知上报话题
    #[serde(default = "default_perception_topic")]
    pub perception: String,

    /// 感知真值话题
    #[serde(default = "default_ground_truth_topic")]
    pub ground_truth_perception: String,

    /// 本机里程计话题
    #[serde(default = "default_odometry_topic")]
    pub ego_odometry: String,

    /// 碰撞状态话题
    #[serde(default = "default_collision_topic")]
    pub collision: String,

    /// 实体位姿话题列表 (实体 ID 取话题的第三个路径段)
    #[serde(default)]
    pub entity_poses: Vec<String>,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            perception: default_perception_topic(),
            ground_truth_perception: default_ground_truth_topic(),
            ego_odometry: default_odometry_topic(),
            collision: default_collision_topic(),
            entity_poses: Vec::new(),
        }
    }
}

fn default_perception_topic() -> String {
    "/adk_node/input/perception".to_string()
}

fn default_ground_truth_topic() -> String {
    "/adk_node/ground_truth/perception".to_string()
}

fn default_odometry_topic() -> String {
    "/adk_node/SimpleFlight/odom_local_ned".to_string()
}

fn default_collision_topic() -> String {
    "/adk_node/SimpleFlight/collision_state".to_string()
}

/// 实体配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// 唯一标识符
    pub id: String,

    /// 实体类别 (e.g., "car", "drone")
    pub class: String,

    /// 实体颜色
    pub color: String,
}

/// 回放策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// 场景线程
    #[serde(default)]
    pub scenario_thread: ScenarioThread,

    /// 位姿关联时间容差 (秒)
    #[serde(default = "default_pose_time_tolerance")]
    pub pose_time_tolerance_s: f64,

    /// 位置去抖阈值 (米，任一坐标轴)
    #[serde(default = "default_debounce_axis")]
    pub debounce_axis_m: f64,

    /// 默认回放步长 (秒)
    #[serde(default = "default_timestep")]
    pub timestep_s: f64,

    /// 窗口聚合策略
    #[serde(default)]
    pub aggregation: StepPolicy,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            scenario_thread: ScenarioThread::default(),
            pose_time_tolerance_s: default_pose_time_tolerance(),
            debounce_axis_m: default_debounce_axis(),
            timestep_s: default_timestep(),
            aggregation: StepPolicy::default(),
        }
    }
}

fn default_pose_time_tolerance() -> f64 {
    5.0
}

fn default_debounce_axis() -> f64 {
    5.0
}

fn default_timestep() -> f64 {
    0.1
}

/// 场景线程
///
/// maneuver 线程抑制感知话题的真实上报，并从成功关联的感知真值
/// 事件镜像合成上报。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioThread {
    /// 感知线程：上报事件直接来自感知话题
    #[default]
    #[serde(alias = "perception_thread")]
    Perception,

    /// 机动线程：上报事件由感知真值关联结果合成
    #[serde(alias = "maneuver_thread")]
    Maneuver,
}

impl MissionConfig {
    /// Collect every topic the replay pipeline subscribes to.
    ///
    /// The union of the four role topics and the entity pose topics, with
    /// duplicates removed while preserving order.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics = vec![
            self.topics.perception.clone(),
            self.topics.ground_truth_perception.clone(),
            self.topics.ego_odometry.clone(),
            self.topics.collision.clone(),
        ];
        for topic in &self.topics.entity_poses {
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        topics
    }

    /// Build the entity attribute lookup keyed by EntityId.
    pub fn entity_attribute_map(&self) -> HashMap<EntityId, EntityConfig> {
        self.entities
            .iter()
            .map(|entity| (EntityId::new(&entity.id), entity.clone()))
            .collect()
    }
}
