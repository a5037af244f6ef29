//! ros2msg schema parsing
//!
//! A bag channel carries its full message definition as concatenated
//! `.msg` text: the top-level type first, then one section per
//! dependency, each introduced by an 80 character `=` delimiter line
//! and a `MSG: <package>/<Type>` header.

use crate::error::{DecodeError, Result};

/// ros2msg 基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Byte,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Str,
    WStr,
}

impl Primitive {
    fn parse(token: &str) -> Option<Self> {
        // Bounded strings (string<=N) decode exactly like unbounded ones
        if let Some(rest) = token.strip_prefix("wstring") {
            return (rest.is_empty() || rest.starts_with("<=")).then_some(Self::WStr);
        }
        if let Some(rest) = token.strip_prefix("string") {
            return (rest.is_empty() || rest.starts_with("<=")).then_some(Self::Str);
        }
        match token {
            "bool" => Some(Self::Bool),
            "byte" => Some(Self::Byte),
            "char" => Some(Self::Char),
            "int8" => Some(Self::Int8),
            "int16" => Some(Self::Int16),
            "int32" => Some(Self::Int32),
            "int64" => Some(Self::Int64),
            "uint8" => Some(Self::UInt8),
            "uint16" => Some(Self::UInt16),
            "uint32" => Some(Self::UInt32),
            "uint64" => Some(Self::UInt64),
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            _ => None,
        }
    }
}

/// 字段的重数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// 单值
    Unit,
    /// 定长数组 `T[N]`，线上无长度前缀
    Array(usize),
    /// 序列 `T[]` 或有界序列 `T[<=N]`，线上带 u32 长度前缀
    Sequence,
}

/// 字段类型：基本类型或指向依赖定义的索引
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Primitive(Primitive),
    /// `MessageSchema` 内部类型表的下标
    Complex(usize),
}

/// 单个字段声明
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// 字段名
    pub name: String,
    /// 字段类型
    pub ty: FieldType,
    /// 重数
    pub arity: Arity,
}

/// 一个 `.msg` 小节解析出的结构定义
#[derive(Debug, Clone, Default)]
pub struct StructDef {
    /// 完整类型名，如 `geometry_msgs/msg/Point`
    pub name: String,
    /// 字段声明，按线上顺序
    pub fields: Vec<FieldDef>,
}

/// 解析完成的通道 schema
///
/// 类型表下标 0 为顶层类型，其余为依赖。
#[derive(Debug, Clone)]
pub struct MessageSchema {
    types: Vec<StructDef>,
}

impl MessageSchema {
    /// Parse concatenated ros2msg text into a resolved schema.
    ///
    /// `name` names the top-level type (the channel's schema name).
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let sections = split_sections(name, text);

        let mut types = Vec::with_capacity(sections.len());
        let mut raw_fields = Vec::with_capacity(sections.len());
        for (section_name, lines) in &sections {
            let mut fields = Vec::new();
            for line in lines {
                if let Some(decl) = parse_field_line(line)? {
                    fields.push(decl);
                }
            }
            types.push(StructDef {
                name: section_name.clone(),
                fields: Vec::new(),
            });
            raw_fields.push(fields);
        }

        let owned_names: Vec<String> = types.iter().map(|t| t.name.clone()).collect();
        let names: Vec<&str> = owned_names.iter().map(|s| s.as_str()).collect();
        for (index, fields) in raw_fields.into_iter().enumerate() {
            let package = package_of(&types[index].name).to_owned();
            let mut resolved = Vec::with_capacity(fields.len());
            for (type_token, field_name) in fields {
                let (base, arity) = split_arity(&type_token)?;
                let ty = match Primitive::parse(base) {
                    Some(p) => FieldType::Primitive(p),
                    None => match resolve_complex(base, &package, &names) {
                        Some(i) => FieldType::Complex(i),
                        None => {
                            return Err(DecodeError::UnknownType {
                                field: field_name,
                                type_name: base.to_owned(),
                            })
                        }
                    },
                };
                resolved.push(FieldDef {
                    name: field_name,
                    ty,
                    arity,
                });
            }
            types[index].fields = resolved;
        }

        Ok(Self { types })
    }

    /// 顶层类型定义
    pub fn root(&self) -> &StructDef {
        &self.types[0]
    }

    /// 按下标取依赖定义
    pub fn get(&self, index: usize) -> &StructDef {
        &self.types[index]
    }
}

fn is_section_delimiter(line: &str) -> bool {
    line.len() >= 3 && line.bytes().all(|b| b == b'=')
}

/// 切分小节，返回 (类型名, 原始行) 列表；下标 0 为顶层
fn split_sections<'a>(name: &str, text: &'a str) -> Vec<(String, Vec<&'a str>)> {
    let mut sections: Vec<(String, Vec<&'a str>)> = vec![(name.to_owned(), Vec::new())];
    let mut expecting_name = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if is_section_delimiter(trimmed) {
            expecting_name = true;
            continue;
        }
        if expecting_name {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(section_name) = trimmed.strip_prefix("MSG:") {
                sections.push((section_name.trim().to_owned(), Vec::new()));
                expecting_name = false;
                continue;
            }
            expecting_name = false;
        }
        if let Some(section) = sections.last_mut() {
            section.1.push(line);
        }
    }
    sections
}

/// Parse one declaration line into `(type_token, field_name)`.
///
/// Blank lines, comments and constants yield `None`.
fn parse_field_line(line: &str) -> Result<Option<(String, String)>> {
    let line = line.split('#').next().unwrap_or("");
    let mut tokens = line.split_whitespace();
    let Some(type_token) = tokens.next() else {
        return Ok(None);
    };
    let Some(name) = tokens.next() else {
        return Err(DecodeError::malformed(line.trim()));
    };
    // Constants carry '=' after the type token; bounded strings keep
    // their '<=' inside the type token and do not trip this.
    if name.contains('=') || tokens.any(|t| t.contains('=')) {
        return Ok(None);
    }
    Ok(Some((type_token.to_owned(), name.to_owned())))
}

/// 从类型记号剥离数组后缀
fn split_arity(token: &str) -> Result<(&str, Arity)> {
    let Some(open) = token.find('[') else {
        return Ok((token, Arity::Unit));
    };
    let close = match token.rfind(']') {
        Some(close) if close > open => close,
        _ => return Err(DecodeError::malformed(token)),
    };
    let base = &token[..open];
    let inside = &token[open + 1..close];
    let arity = if inside.is_empty() {
        Arity::Sequence
    } else if let Some(bound) = inside.strip_prefix("<=") {
        // Bounded sequences share the unbounded wire form
        if bound.trim().parse::<usize>().is_err() {
            return Err(DecodeError::malformed(token));
        }
        Arity::Sequence
    } else {
        match inside.parse::<usize>() {
            Ok(n) => Arity::Array(n),
            Err(_) => return Err(DecodeError::malformed(token)),
        }
    };
    Ok((base, arity))
}

fn package_of(type_name: &str) -> &str {
    type_name.split('/').next().unwrap_or("")
}

/// Resolve a complex type token against the section names.
///
/// Tries, in order: exact match, `pkg/Type` expanded to `pkg/msg/Type`,
/// bare names within the referencing section's own package, then any
/// section whose name ends with `/Type`.
fn resolve_complex(token: &str, package: &str, names: &[&str]) -> Option<usize> {
    if let Some(i) = names.iter().position(|n| *n == token) {
        return Some(i);
    }
    if let Some((pkg, bare)) = token.rsplit_once('/') {
        let expanded = format!("{pkg}/msg/{bare}");
        if let Some(i) = names.iter().position(|n| *n == expanded) {
            return Some(i);
        }
        let suffix = format!("/{bare}");
        return names.iter().position(|n| n.ends_with(&suffix));
    }
    if !package.is_empty() {
        let sibling = format!("{package}/msg/{token}");
        if let Some(i) = names.iter().position(|n| *n == sibling) {
            return Some(i);
        }
        let flat = format!("{package}/{token}");
        if let Some(i) = names.iter().position(|n| *n == flat) {
            return Some(i);
        }
    }
    let suffix = format!("/{token}");
    names.iter().position(|n| n.ends_with(&suffix))
}
