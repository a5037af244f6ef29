//! Ingestion 错误类型

use thiserror::Error;

/// 解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    /// 载荷在某个偏移处被截断
    #[error("payload truncated at offset {offset}: need {needed} bytes, {remaining} remain")]
    Truncated {
        /// 出错时的读取偏移
        offset: usize,
        /// 还需要的字节数
        needed: usize,
        /// 剩余字节数
        remaining: usize,
    },

    /// CDR 封装头非法
    #[error("bad CDR encapsulation header: {header:02x?}")]
    BadEncapsulation {
        /// 载荷前四个字节
        header: Vec<u8>,
    },

    /// 字符串字段不是合法 UTF-8
    #[error("invalid utf-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// 字符串数据的起始偏移
        offset: usize,
    },

    /// 字段声明无法解析
    #[error("malformed field declaration: '{line}'")]
    MalformedField {
        /// 原始声明行
        line: String,
    },

    /// 字段引用了 schema 中不存在的类型
    #[error("field '{field}' references unknown type '{type_name}'")]
    UnknownType {
        /// 字段名
        field: String,
        /// 未解析的类型记号
        type_name: String,
    },
}

impl DecodeError {
    /// 构造 MalformedField 错误
    pub fn malformed(line: impl Into<String>) -> Self {
        Self::MalformedField { line: line.into() }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, DecodeError>;
