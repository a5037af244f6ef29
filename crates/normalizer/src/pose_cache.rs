//! Entity pose cache and movement debounce.

use std::collections::HashMap;

use contracts::{Attitude, EntityId, Vector3};

/// 缓存的实体位姿
#[derive(Debug, Clone, Copy)]
pub struct CachedPose {
    /// 位姿时间戳（秒）
    pub timestamp: f64,
    /// 位置
    pub position: Vector3,
    /// 姿态
    pub attitude: Attitude,
}

/// 每个实体的最近一次原始位姿
///
/// 地面真值报告只带初始位置，后续相关性全部依赖这里缓存的
/// 原始位姿流。
#[derive(Debug, Default)]
pub struct EntityPoseCache {
    poses: HashMap<EntityId, CachedPose>,
}

impl EntityPoseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 实体的最近位姿
    pub fn get(&self, entity: &EntityId) -> Option<&CachedPose> {
        self.poses.get(entity)
    }

    /// Store the latest pose.
    ///
    /// Returns true when the entity is new, or when any single axis
    /// moved more than `debounce_axis` relative to the previously
    /// stored pose (per-axis, not the Euclidean norm).
    pub fn update(&mut self, entity: &EntityId, pose: CachedPose, debounce_axis: f64) -> bool {
        let moved = match self.poses.get(entity) {
            None => true,
            Some(previous) => {
                exceeds_axis_threshold(previous.position, pose.position, debounce_axis)
            }
        };
        self.poses.insert(entity.clone(), pose);
        moved
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

fn exceeds_axis_threshold(a: Vector3, b: Vector3, threshold: f64) -> bool {
    (a.x - b.x).abs() > threshold || (a.y - b.y).abs() > threshold || (a.z - b.z).abs() > threshold
}
