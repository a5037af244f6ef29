//! # Normalizer
//!
//! 规范事件归一化器。
//!
//! 负责：
//! - topic → 通道角色分发
//! - 实体位姿缓存与去抖
//! - 地面真值报告与原始位姿的相关性
//! - 产出按时间排序的 `CanonicalEvent` 序列
//!
//! ## 使用示例
//!
//! ```ignore
//! use normalizer::EventNormalizer;
//!
//! let mut normalizer = EventNormalizer::new(&config);
//!
//! for (topic, message) in decoded_messages {
//!     normalizer.handle(&topic, &message);
//! }
//!
//! let events = normalizer.finish();
//! ```

mod euler;
mod normalizer;
mod pose_cache;
mod role;

// Re-exports
pub use contracts::{CanonicalEvent, EventKind, MessageValue, MissionConfig};
pub use euler::quat_to_attitude;
pub use normalizer::{EventNormalizer, NormalizeStats};
pub use pose_cache::{CachedPose, EntityPoseCache};
pub use role::{entity_from_topic, ChannelRole, RoleTable};
