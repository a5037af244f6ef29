//! RawRecord - Ingestion 输出
//!
//! 原始通道消息记录。

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 通道描述符
///
/// 描述 bag 容器内单个消息通道的身份与 schema。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// 话题名称
    pub topic: String,

    /// Schema 名称 (e.g., "adk_msgs/msg/PerceptionReport")
    pub schema_name: String,

    /// Schema 编码 (期望 "ros2msg")
    pub schema_encoding: String,

    /// Schema 文本 (级联 ros2msg 定义)
    pub schema_text: String,

    /// 消息编码 (期望 "cdr")
    pub message_encoding: String,
}

/// 原始消息记录
///
/// 从 bag 容器读出的单条未解码消息。
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 所属通道
    pub channel: Arc<ChannelDescriptor>,

    /// 容器记录时间 (纳秒)
    pub log_time_ns: u64,

    /// 数据载荷 (零拷贝)
    pub data: Bytes,
}
