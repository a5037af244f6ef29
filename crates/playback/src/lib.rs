//! # Playback
//!
//! 固定步长回放推进器。
//!
//! 负责：
//! - 按 timestep 划分回放窗口
//! - 窗口内按策略折叠事件（均值 / 快照）
//! - 自机与实体状态跨窗口保持
//! - 输出 `WorldFrame`
//!
//! ## 使用示例
//!
//! ```ignore
//! use playback::{PlaybackStepper, StepPolicy};
//!
//! let mut stepper = PlaybackStepper::new(events, StepPolicy::default());
//!
//! while let Some(frame) = stepper.advance(0.1) {
//!     // Handle the aggregated world frame
//! }
//! ```

mod accumulator;
mod stepper;

// Re-exports
pub use stepper::PlaybackStepper;

// Re-export contracts types
pub use contracts::{
    AggregationPolicy, CanonicalEvent, EgoState, EntityState, FrameMeta, ReportedDetection,
    StepPolicy, WorldFrame,
};
