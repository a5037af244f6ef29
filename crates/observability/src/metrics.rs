//! 回放管线指标收集模块
//!
//! 基于 WorldFrame 收集和统计回放运行指标。

use contracts::WorldFrame;
use metrics::{counter, gauge, histogram};

/// 从 WorldFrame 记录指标
///
/// 每次推进产生一帧时调用此函数来记录指标。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_metrics;
///
/// while let Some(frame) = stepper.advance(timestep) {
///     record_frame_metrics(&frame);
///     // ...
/// }
/// ```
pub fn record_frame_metrics(frame: &WorldFrame) {
    // 帧计数器
    counter!("bag_replay_frames_total").increment(1);

    // 帧 ID (用于检测跳帧)
    gauge!("bag_replay_last_frame_id").set(frame.frame_id as f64);

    // 回放时钟与进度
    gauge!("bag_replay_clock_seconds").set(frame.t_end);
    gauge!("bag_replay_elapsed_seconds").set(frame.elapsed);

    // 窗口事件数
    histogram!("bag_replay_window_events").record(f64::from(frame.meta.events_folded));

    // 自机状态
    gauge!("bag_replay_ego_speed").set(frame.ego.speed);
    histogram!("bag_replay_ego_speed_hist").record(frame.ego.speed);

    // 实体与检测
    gauge!("bag_replay_entities_tracked").set(frame.entities.len() as f64);
    histogram!("bag_replay_detections_per_frame").record(frame.detections.len() as f64);

    // 碰撞帧
    if frame.ego.collision {
        counter!("bag_replay_collision_frames_total").increment(1);
    }

    for detection in &frame.detections {
        histogram!(
            "bag_replay_detection_confidence",
            "entity_id" => detection.entity_id.to_string()
        )
        .record(detection.confidence);
    }
}

/// 记录 bag 消息读取
pub fn record_record_read(topic: &str) {
    counter!(
        "bag_replay_records_read_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

/// 记录导出写入
pub fn record_export_written(format: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "bag_replay_exports_total",
        "format" => format.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录单次推进耗时
pub fn record_step_duration_ms(duration_ms: f64) {
    histogram!("bag_replay_step_duration_ms").record(duration_ms);
}

/// 回放指标聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ReplayMetricsAggregator {
    /// 总帧数
    pub total_frames: u64,

    /// 折叠事件总数
    pub total_events: u64,

    /// 检测上报总数
    pub total_detections: u64,

    /// 碰撞帧数
    pub collision_frames: u64,

    /// 回放时间跨度 (最后一帧的 elapsed)
    pub replay_span_s: f64,

    /// 窗口事件数统计
    pub window_event_stats: RunningStats,

    /// 自机速度统计
    pub speed_stats: RunningStats,

    /// 检测置信度统计
    pub confidence_stats: RunningStats,

    /// 各实体被检测次数
    pub detection_counts: std::collections::HashMap<String, u64>,

    /// 最后一帧跟踪的实体数
    pub entities_tracked: usize,
}

impl ReplayMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, frame: &WorldFrame) {
        self.total_frames += 1;
        self.total_events += u64::from(frame.meta.events_folded);
        self.total_detections += frame.detections.len() as u64;
        self.replay_span_s = frame.elapsed;
        self.entities_tracked = frame.entities.len();

        if frame.ego.collision {
            self.collision_frames += 1;
        }

        self.window_event_stats
            .push(f64::from(frame.meta.events_folded));
        self.speed_stats.push(frame.ego.speed);

        for detection in &frame.detections {
            self.confidence_stats.push(detection.confidence);
            *self
                .detection_counts
                .entry(detection.entity_id.to_string())
                .or_insert(0) += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            total_frames: self.total_frames,
            total_events: self.total_events,
            total_detections: self.total_detections,
            collision_frames: self.collision_frames,
            collision_rate: if self.total_frames > 0 {
                self.collision_frames as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            replay_span_s: self.replay_span_s,
            entities_tracked: self.entities_tracked,
            window_events: StatsSummary::from(&self.window_event_stats),
            ego_speed: StatsSummary::from(&self.speed_stats),
            detection_confidence: StatsSummary::from(&self.confidence_stats),
            detection_counts: self.detection_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 回放摘要
#[derive(Debug, Clone, Default)]
pub struct ReplaySummary {
    pub total_frames: u64,
    pub total_events: u64,
    pub total_detections: u64,
    pub collision_frames: u64,
    pub collision_rate: f64,
    pub replay_span_s: f64,
    pub entities_tracked: usize,
    pub window_events: StatsSummary,
    pub ego_speed: StatsSummary,
    pub detection_confidence: StatsSummary,
    pub detection_counts: std::collections::HashMap<String, u64>,
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Replay Summary ===")?;
        writeln!(f, "Frames: {}", self.total_frames)?;
        writeln!(f, "Events folded: {}", self.total_events)?;
        writeln!(f, "Replay span: {:.2}s", self.replay_span_s)?;
        writeln!(f, "Entities tracked: {}", self.entities_tracked)?;
        writeln!(
            f,
            "Collision frames: {} ({:.2}%)",
            self.collision_frames, self.collision_rate
        )?;
        writeln!(f, "Detections: {}", self.total_detections)?;
        writeln!(f, "Events per window: {}", self.window_events)?;
        writeln!(f, "Ego speed (m/s): {}", self.ego_speed)?;
        writeln!(f, "Detection confidence: {}", self.detection_confidence)?;

        if !self.detection_counts.is_empty() {
            writeln!(f, "Detections per entity:")?;
            for (entity, count) in &self.detection_counts {
                writeln!(f, "  {}: {}", entity, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
