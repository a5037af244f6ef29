//! MessageValue - Message Decoder 输出
//!
//! 动态类型的解码消息值树。

/// 解码后的消息值
///
/// 结构体字段按 schema 声明顺序保存。
#[derive(Debug, Clone, PartialEq)]
pub enum MessageValue {
    /// 布尔值
    Bool(bool),
    /// 有符号整数 (int8/16/32/64 加宽)
    Int(i64),
    /// 无符号整数 (uint8/16/32/64, byte, char 加宽)
    UInt(u64),
    /// 浮点数 (float32/64 加宽)
    Float(f64),
    /// 字符串
    Str(String),
    /// 结构体 (字段名, 值)
    Struct(Vec<(String, MessageValue)>),
    /// 数组或序列
    Array(Vec<MessageValue>),
}

impl MessageValue {
    /// Look up a direct struct field by name.
    pub fn field(&self, name: &str) -> Option<&MessageValue> {
        match self {
            MessageValue::Struct(fields) => fields
                .iter()
                .find(|(field_name, _)| field_name == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Navigate a dotted field path, e.g. `"pose.pose.position.x"`.
    pub fn at(&self, path: &str) -> Option<&MessageValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.field(segment)?;
        }
        Some(current)
    }

    /// Numeric value widened to f64 (accepts float, int, uint).
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            MessageValue::Float(v) => Some(v),
            MessageValue::Int(v) => Some(v as f64),
            MessageValue::UInt(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Integer value widened to i64 (accepts int, uint within range).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            MessageValue::Int(v) => Some(v),
            MessageValue::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            MessageValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// String slice value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MessageValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Array elements.
    pub fn as_array(&self) -> Option<&[MessageValue]> {
        match self {
            MessageValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// f64 at a dotted path.
    pub fn f64_at(&self, path: &str) -> Option<f64> {
        self.at(path)?.as_f64()
    }

    /// i64 at a dotted path.
    pub fn i64_at(&self, path: &str) -> Option<i64> {
        self.at(path)?.as_i64()
    }

    /// bool at a dotted path.
    pub fn bool_at(&self, path: &str) -> Option<bool> {
        self.at(path)?.as_bool()
    }

    /// &str at a dotted path.
    pub fn str_at(&self, path: &str) -> Option<&str> {
        self.at(path)?.as_str()
    }
}
