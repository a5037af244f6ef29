//! MCAP 容器读取
//!
//! 把容器里的消息流暴露为 `RawRecord` 迭代器，通道信息缓存为
//! `Arc<ChannelDescriptor>` 供下游共享。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{ChannelDescriptor, RawRecord, ReplayError};
use mcap::MessageStream;
use serde::Serialize;
use tracing::debug;

/// 已打开并通过校验的 MCAP 容器
#[derive(Debug)]
pub struct BagReader {
    path: PathBuf,
    data: Vec<u8>,
}

impl BagReader {
    /// Read the whole file and validate the container framing up front.
    pub fn open(path: &Path) -> Result<Self, ReplayError> {
        let data = std::fs::read(path)?;
        if let Err(e) = MessageStream::new(&data) {
            return Err(ReplayError::bag_read(format!("{}: {e}", path.display())));
        }
        debug!(path = %path.display(), bytes = data.len(), "opened bag container");
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// 容器文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 按记录时间顺序迭代全部记录
    pub fn records(&self) -> Result<RecordIter<'_>, ReplayError> {
        self.records_inner(None)
    }

    /// 只迭代订阅 topic 上的记录
    pub fn records_on_topics(&self, topics: &[String]) -> Result<RecordIter<'_>, ReplayError> {
        self.records_inner(Some(topics.iter().cloned().collect()))
    }

    fn records_inner(&self, filter: Option<HashSet<String>>) -> Result<RecordIter<'_>, ReplayError> {
        let stream =
            MessageStream::new(&self.data).map_err(|e| ReplayError::bag_read(e.to_string()))?;
        Ok(RecordIter {
            stream,
            channels: HashMap::new(),
            filter,
        })
    }

    /// Summarize every channel seen in the log: one full pass, sorted
    /// by topic.
    pub fn channel_summary(&self) -> Result<Vec<ChannelInfo>, ReplayError> {
        let stream =
            MessageStream::new(&self.data).map_err(|e| ReplayError::bag_read(e.to_string()))?;
        let mut by_topic: BTreeMap<String, ChannelInfo> = BTreeMap::new();
        for message in stream {
            let message = message.map_err(|e| ReplayError::bag_read(e.to_string()))?;
            let entry = by_topic
                .entry(message.channel.topic.clone())
                .or_insert_with(|| ChannelInfo {
                    topic: message.channel.topic.clone(),
                    schema_name: message
                        .channel
                        .schema
                        .as_ref()
                        .map(|s| s.name.clone())
                        .unwrap_or_default(),
                    schema_encoding: message
                        .channel
                        .schema
                        .as_ref()
                        .map(|s| s.encoding.clone())
                        .unwrap_or_default(),
                    message_encoding: message.channel.message_encoding.clone(),
                    message_count: 0,
                    first_log_time_ns: message.log_time,
                    last_log_time_ns: message.log_time,
                });
            entry.message_count += 1;
            entry.first_log_time_ns = entry.first_log_time_ns.min(message.log_time);
            entry.last_log_time_ns = entry.last_log_time_ns.max(message.log_time);
        }
        Ok(by_topic.into_values().collect())
    }
}

/// 单个通道的概要信息
#[derive(Debug, Clone, Serialize)]
pub struct ChannelInfo {
    /// Topic 名
    pub topic: String,

    /// Schema 名
    pub schema_name: String,

    /// Schema 编码
    pub schema_encoding: String,

    /// 消息编码
    pub message_encoding: String,

    /// 记录条数
    pub message_count: u64,

    /// 最早记录时间（纳秒）
    pub first_log_time_ns: u64,

    /// 最晚记录时间（纳秒）
    pub last_log_time_ns: u64,
}

/// 原始记录迭代器
pub struct RecordIter<'a> {
    stream: MessageStream<'a>,
    channels: HashMap<String, Arc<ChannelDescriptor>>,
    filter: Option<HashSet<String>>,
}

impl RecordIter<'_> {
    fn descriptor_for(&mut self, channel: &mcap::Channel<'_>) -> Arc<ChannelDescriptor> {
        if let Some(existing) = self.channels.get(channel.topic.as_str()) {
            return existing.clone();
        }
        let descriptor = Arc::new(describe_channel(channel));
        self.channels
            .insert(channel.topic.clone(), descriptor.clone());
        descriptor
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<RawRecord, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let message = match self.stream.next()? {
                Ok(message) => message,
                Err(e) => return Some(Err(ReplayError::bag_read(e.to_string()))),
            };
            if let Some(filter) = &self.filter {
                if !filter.contains(message.channel.topic.as_str()) {
                    continue;
                }
            }
            let channel = self.descriptor_for(&message.channel);
            return Some(Ok(RawRecord {
                channel,
                log_time_ns: message.log_time,
                data: Bytes::copy_from_slice(&message.data),
            }));
        }
    }
}

fn describe_channel(channel: &mcap::Channel<'_>) -> ChannelDescriptor {
    let (schema_name, schema_encoding, schema_text) = match &channel.schema {
        Some(schema) => (
            schema.name.clone(),
            schema.encoding.clone(),
            String::from_utf8_lossy(&schema.data).into_owned(),
        ),
        None => (String::new(), String::new(), String::new()),
    };
    ChannelDescriptor {
        topic: channel.topic.clone(),
        schema_name,
        schema_encoding,
        schema_text,
        message_encoding: channel.message_encoding.clone(),
    }
}
