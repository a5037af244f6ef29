//! 配置校验模块
//!
//! 校验规则：
//! - entity id 唯一且非空
//! - entity class / color 非空
//! - 话题名非空且以 '/' 开头
//! - entity_poses 话题至少三段 (可推导实体 ID)，且不重复
//! - timestep_s > 0, pose_time_tolerance_s > 0, debounce_axis_m >= 0

use std::collections::HashSet;

use contracts::{MissionConfig, ReplayError};

/// 校验 MissionConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &MissionConfig) -> Result<(), ReplayError> {
    validate_entities(config)?;
    validate_topics(config)?;
    validate_replay(config)?;
    Ok(())
}

/// 校验实体列表
fn validate_entities(config: &MissionConfig) -> Result<(), ReplayError> {
    let mut seen = HashSet::new();
    for (idx, entity) in config.entities.iter().enumerate() {
        if entity.id.is_empty() {
            return Err(ReplayError::config_validation(
                format!("entities[{idx}].id"),
                "entity id cannot be empty",
            ));
        }
        if !seen.insert(&entity.id) {
            return Err(ReplayError::config_validation(
                format!("entities[id={}]", entity.id),
                "duplicate entity id",
            ));
        }
        if entity.class.is_empty() {
            return Err(ReplayError::config_validation(
                format!("entities[{}].class", entity.id),
                "entity class cannot be empty",
            ));
        }
        if entity.color.is_empty() {
            return Err(ReplayError::config_validation(
                format!("entities[{}].color", entity.id),
                "entity color cannot be empty",
            ));
        }
    }
    Ok(())
}

/// 校验话题配置
fn validate_topics(config: &MissionConfig) -> Result<(), ReplayError> {
    let role_topics = [
        ("topics.perception", &config.topics.perception),
        (
            "topics.ground_truth_perception",
            &config.topics.ground_truth_perception,
        ),
        ("topics.ego_odometry", &config.topics.ego_odometry),
        ("topics.collision", &config.topics.collision),
    ];
    for (field, topic) in role_topics {
        validate_topic_name(field, topic)?;
    }

    let mut seen = HashSet::new();
    for (idx, topic) in config.topics.entity_poses.iter().enumerate() {
        let field = format!("topics.entity_poses[{idx}]");
        validate_topic_name(&field, topic)?;

        // 实体 ID 取第三个路径段，必须存在
        let entity_segment = topic.split('/').nth(2).unwrap_or("");
        if entity_segment.is_empty() {
            return Err(ReplayError::config_validation(
                field,
                format!("cannot derive an entity id from pose topic '{topic}'"),
            ));
        }

        if !seen.insert(topic) {
            return Err(ReplayError::config_validation(
                field,
                format!("duplicate entity pose topic '{topic}'"),
            ));
        }
    }
    Ok(())
}

fn validate_topic_name(field: &str, topic: &str) -> Result<(), ReplayError> {
    if topic.is_empty() {
        return Err(ReplayError::config_validation(
            field,
            "topic cannot be empty",
        ));
    }
    if !topic.starts_with('/') {
        return Err(ReplayError::config_validation(
            field,
            format!("topic '{topic}' must start with '/'"),
        ));
    }
    Ok(())
}

/// 校验回放策略
fn validate_replay(config: &MissionConfig) -> Result<(), ReplayError> {
    let replay = &config.replay;

    if !(replay.timestep_s > 0.0) {
        return Err(ReplayError::config_validation(
            "replay.timestep_s",
            format!("timestep_s must be > 0, got {}", replay.timestep_s),
        ));
    }
    if !(replay.pose_time_tolerance_s > 0.0) {
        return Err(ReplayError::config_validation(
            "replay.pose_time_tolerance_s",
            format!(
                "pose_time_tolerance_s must be > 0, got {}",
                replay.pose_time_tolerance_s
            ),
        ));
    }
    if !(replay.debounce_axis_m >= 0.0) {
        return Err(ReplayError::config_validation(
            "replay.debounce_axis_m",
            format!("debounce_axis_m must be >= 0, got {}", replay.debounce_axis_m),
        ));
    }
    Ok(())
}
