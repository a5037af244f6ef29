//! CanonicalEvent - Normalizer 输出
//!
//! 规范化回放事件结构。

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// 规范化事件
///
/// 由 bag 消息归一化得到的单条回放事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// 事件时间戳 (seconds, f64) - 主时钟
    pub timestamp: f64,

    /// 事件载荷
    #[serde(flatten)]
    pub kind: EventKind,
}

/// 事件载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EventKind {
    /// 实体真值位置
    #[serde(rename = "GT_POSITION")]
    GtPosition(GtPositionEvent),

    /// 本机里程计
    #[serde(rename = "ODOM")]
    Odometry(OdometryEvent),

    /// 感知上报
    #[serde(rename = "MSG")]
    Detection(DetectionEvent),

    /// 碰撞
    #[serde(rename = "CLSN")]
    Collision(CollisionEvent),
}

impl EventKind {
    /// 事件导出标签
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::GtPosition(_) => "GT_POSITION",
            EventKind::Odometry(_) => "ODOM",
            EventKind::Detection(_) => "MSG",
            EventKind::Collision(_) => "CLSN",
        }
    }
}

/// 实体真值位置事件
///
/// 来自去抖后的实体位姿话题，或成功关联缓存位姿的感知真值话题。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtPositionEvent {
    /// 实体 ID
    pub entity_id: EntityId,

    /// 位置 (x, y, z) 单位：米
    pub position: Vector3,

    /// 姿态角 (roll, pitch, yaw) 单位：弧度
    pub attitude: Attitude,
}

/// 本机里程计事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryEvent {
    /// 位置 (x, y, z) 单位：米
    pub position: Vector3,

    /// 姿态角 (roll, pitch, yaw) 单位：弧度
    pub attitude: Attitude,

    /// 线速度 (m/s)
    pub velocity: Vector3,

    /// 角速度 (rad/s)
    pub angular_velocity: Vector3,
}

/// 感知上报事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// 实体 ID
    pub entity_id: EntityId,

    /// 位置 (x, y, z) 单位：米
    pub position: Vector3,

    /// 姿态角 (roll, pitch, yaw) 单位：弧度
    pub attitude: Attitude,

    /// 实体类别 (来自任务配置)
    pub class: String,

    /// 实体颜色 (来自任务配置)
    pub color: String,

    /// 置信度 (0-1)
    pub confidence: f64,
}

/// 碰撞事件
///
/// 仅在 has_collided 为真时产生，心跳消息不生成事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// 碰撞对象名称
    pub object_name: String,

    /// 碰撞对象 ID
    pub object_id: i64,
}

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 姿态角 (弧度)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Attitude {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}
