//! Per-channel message decoding
//!
//! One `MessageDecoder` per channel, built from the channel schema on
//! first use and cached by topic. Perception records that fail to
//! decode get one schema patch and retry; a failure that survives the
//! patch is fatal. Failures on any other channel skip the record.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ChannelDescriptor, MessageValue, RawRecord, ReplayError};
use tracing::{debug, warn};

use crate::cdr::CdrCursor;
use crate::error::{DecodeError, Result as DecodeResult};
use crate::schema::{Arity, FieldType, MessageSchema, Primitive, StructDef};

/// Field declarations present in stale perception schemas but absent
/// from the recorded payloads. Stripped verbatim before the retry.
const STALE_PERCEPTION_FIELDS: [&str; 2] = ["sensor_msgs/Image image\n", "Box2D bounding_box2d\n"];

/// 单通道解码器
pub struct MessageDecoder {
    schema: MessageSchema,
}

impl MessageDecoder {
    /// 从 ros2msg 文本构建解码器
    pub fn from_schema_text(name: &str, text: &str) -> DecodeResult<Self> {
        Ok(Self {
            schema: MessageSchema::parse(name, text)?,
        })
    }

    /// Decode one CDR payload into a value tree. Trailing bytes after
    /// the top-level struct are tolerated.
    pub fn decode(&self, data: &[u8]) -> DecodeResult<MessageValue> {
        let mut cursor = CdrCursor::new(data)?;
        self.decode_struct(self.schema.root(), &mut cursor)
    }

    fn decode_struct(&self, def: &StructDef, cursor: &mut CdrCursor) -> DecodeResult<MessageValue> {
        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let value = match field.arity {
                Arity::Unit => self.decode_value(field.ty, cursor)?,
                Arity::Array(len) => {
                    let mut items = Vec::with_capacity(len);
                    for _ in 0..len {
                        items.push(self.decode_value(field.ty, cursor)?);
                    }
                    MessageValue::Array(items)
                }
                Arity::Sequence => {
                    let len = cursor.read_len()?;
                    // length prefixes come off the wire, cap the pre-allocation
                    let mut items = Vec::with_capacity(len.min(1024));
                    for _ in 0..len {
                        items.push(self.decode_value(field.ty, cursor)?);
                    }
                    MessageValue::Array(items)
                }
            };
            fields.push((field.name.clone(), value));
        }
        Ok(MessageValue::Struct(fields))
    }

    fn decode_value(&self, ty: FieldType, cursor: &mut CdrCursor) -> DecodeResult<MessageValue> {
        let value = match ty {
            FieldType::Complex(index) => self.decode_struct(self.schema.get(index), cursor)?,
            FieldType::Primitive(p) => match p {
                Primitive::Bool => MessageValue::Bool(cursor.read_bool()?),
                Primitive::Byte | Primitive::Char | Primitive::UInt8 => {
                    MessageValue::UInt(cursor.read_u8()? as u64)
                }
                Primitive::UInt16 => MessageValue::UInt(cursor.read_u16()? as u64),
                Primitive::UInt32 => MessageValue::UInt(cursor.read_u32()? as u64),
                Primitive::UInt64 => MessageValue::UInt(cursor.read_u64()?),
                Primitive::Int8 => MessageValue::Int(cursor.read_i8()? as i64),
                Primitive::Int16 => MessageValue::Int(cursor.read_i16()? as i64),
                Primitive::Int32 => MessageValue::Int(cursor.read_i32()? as i64),
                Primitive::Int64 => MessageValue::Int(cursor.read_i64()?),
                Primitive::Float32 => MessageValue::Float(cursor.read_f32()? as f64),
                Primitive::Float64 => MessageValue::Float(cursor.read_f64()?),
                Primitive::Str => MessageValue::Str(cursor.read_string()?),
                Primitive::WStr => MessageValue::Str(cursor.read_wstring()?),
            },
        };
        Ok(value)
    }
}

/// 解码统计
#[derive(Debug, Default)]
pub struct DecodeStats {
    /// 成功解码的记录数
    pub records_decoded: AtomicU64,

    /// 跳过的记录数
    pub records_skipped: AtomicU64,

    /// 应用 schema 补丁的次数
    pub schema_patches: AtomicU64,
}

impl DecodeStats {
    /// 创建统计实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功解码
    pub fn record_decoded(&self) {
        self.records_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次跳过
    pub fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次 schema 补丁
    pub fn record_patched(&self) {
        self.schema_patches.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取快照
    pub fn snapshot(&self) -> DecodeStatsSnapshot {
        DecodeStatsSnapshot {
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            schema_patches: self.schema_patches.load(Ordering::Relaxed),
        }
    }
}

/// 统计快照
#[derive(Debug, Clone, Default)]
pub struct DecodeStatsSnapshot {
    /// 成功解码的记录数
    pub records_decoded: u64,

    /// 跳过的记录数
    pub records_skipped: u64,

    /// 应用 schema 补丁的次数
    pub schema_patches: u64,
}

/// 按 topic 缓存解码器的集合
pub struct DecoderSet {
    decoders: HashMap<String, MessageDecoder>,
    perception_topic: String,
    stats: Arc<DecodeStats>,
}

impl DecoderSet {
    /// `perception_topic` 上的解码失败允许补丁重试
    pub fn new(perception_topic: impl Into<String>) -> Self {
        Self {
            decoders: HashMap::new(),
            perception_topic: perception_topic.into(),
            stats: Arc::new(DecodeStats::new()),
        }
    }

    /// 共享统计句柄
    pub fn stats(&self) -> Arc<DecodeStats> {
        self.stats.clone()
    }

    /// Decode one record into a value tree.
    ///
    /// `Ok(None)` means the record was skipped: unusable channel, or a
    /// decode failure on a non-perception topic. A perception failure
    /// that survives the schema patch comes back as an error.
    pub fn decode(&mut self, record: &RawRecord) -> Result<Option<MessageValue>, ReplayError> {
        let channel = record.channel.as_ref();
        let topic = channel.topic.as_str();

        if channel.message_encoding != "cdr" {
            warn!(
                topic,
                encoding = %channel.message_encoding,
                "skipping record with unsupported message encoding"
            );
            self.stats.record_skipped();
            metrics::counter!("ingest_records_skipped_total", "reason" => "encoding").increment(1);
            return Ok(None);
        }
        if channel.schema_encoding != "ros2msg" || channel.schema_text.is_empty() {
            warn!(topic, "skipping record on channel without a usable schema");
            self.stats.record_skipped();
            metrics::counter!("ingest_records_skipped_total", "reason" => "schema").increment(1);
            return Ok(None);
        }

        match self.try_decode(channel, &record.data) {
            Ok(value) => {
                self.stats.record_decoded();
                metrics::counter!("ingest_records_decoded_total").increment(1);
                Ok(Some(value))
            }
            Err(cause) if topic == self.perception_topic => {
                self.patch_and_retry(channel, &record.data, cause)
            }
            Err(cause) => {
                warn!(topic, error = %cause, "failed to decode a message");
                self.stats.record_skipped();
                metrics::counter!("ingest_records_skipped_total", "reason" => "decode").increment(1);
                Ok(None)
            }
        }
    }

    fn try_decode(&mut self, channel: &ChannelDescriptor, data: &[u8]) -> DecodeResult<MessageValue> {
        let decoder = match self.decoders.entry(channel.topic.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(MessageDecoder::from_schema_text(
                &channel.schema_name,
                &channel.schema_text,
            )?),
        };
        decoder.decode(data)
    }

    /// 剔除陈旧字段、重建解码器并重试一次
    fn patch_and_retry(
        &mut self,
        channel: &ChannelDescriptor,
        data: &[u8],
        cause: DecodeError,
    ) -> Result<Option<MessageValue>, ReplayError> {
        debug!(topic = %channel.topic, error = %cause, "perception decode failed, patching schema");
        let patched = strip_stale_fields(&channel.schema_text);
        let decoder = MessageDecoder::from_schema_text(&channel.schema_name, &patched)
            .map_err(|e| {
                ReplayError::schema_decode(&channel.topic, format!("patched schema does not parse: {e}"))
            })?;
        let value = decoder.decode(data).map_err(|e| {
            ReplayError::schema_decode(&channel.topic, format!("decode failed after schema patch: {e}"))
        })?;
        self.decoders.insert(channel.topic.clone(), decoder);
        self.stats.record_patched();
        self.stats.record_decoded();
        metrics::counter!("ingest_schema_patches_total").increment(1);
        metrics::counter!("ingest_records_decoded_total").increment(1);
        Ok(Some(value))
    }
}

fn strip_stale_fields(text: &str) -> String {
    let mut patched = text.to_owned();
    for stale in STALE_PERCEPTION_FIELDS {
        patched = patched.replace(stale, "");
    }
    patched
}
