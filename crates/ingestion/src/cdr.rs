//! XCDR1 载荷读写
//!
//! CDR 载荷以 4 字节封装头开始，第 2 个字节选择字节序
//! （0x00 大端，0x01 小端）。基本类型按自身大小对齐，
//! 对齐基准是封装头之后的第一个字节。

use crate::error::{DecodeError, Result};

/// Generate an aligned numeric read for `CdrCursor`
macro_rules! read_numeric {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            self.align(SIZE);
            let bytes = self.take(SIZE)?;
            let mut raw = [0u8; SIZE];
            raw.copy_from_slice(bytes);
            Ok(if self.little_endian {
                <$ty>::from_le_bytes(raw)
            } else {
                <$ty>::from_be_bytes(raw)
            })
        }
    };
}

/// Generate an aligned numeric write for `CdrWriter`
macro_rules! write_numeric {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> &mut Self {
            const SIZE: usize = std::mem::size_of::<$ty>();
            self.align(SIZE);
            self.buf.extend_from_slice(&value.to_le_bytes());
            self
        }
    };
}

/// CDR 载荷读取游标
#[derive(Debug)]
pub struct CdrCursor<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> CdrCursor<'a> {
    /// 校验封装头并定位到载荷起点
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(DecodeError::Truncated {
                offset: 0,
                needed: 4,
                remaining: data.len(),
            });
        }
        let header = &data[..4];
        if header[0] != 0x00 || header[1] > 0x01 {
            return Err(DecodeError::BadEncapsulation {
                header: header.to_vec(),
            });
        }
        Ok(Self {
            data,
            pos: 4,
            little_endian: header[1] == 0x01,
        })
    }

    /// 当前读取偏移（含封装头）
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余未读字节数
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn align(&mut self, size: usize) {
        let misalign = (self.pos - 4) % size;
        if misalign != 0 {
            self.pos += size - misalign;
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    /// 非零字节视为 true
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    read_numeric!(read_u16, u16);
    read_numeric!(read_i16, i16);
    read_numeric!(read_u32, u32);
    read_numeric!(read_i32, i32);
    read_numeric!(read_u64, u64);
    read_numeric!(read_i64, i64);
    read_numeric!(read_f32, f32);
    read_numeric!(read_f64, f64);

    /// 序列长度前缀
    pub fn read_len(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// 字符串：对齐的 u32 长度（含结尾 NUL）+ 字节 + NUL
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        match std::str::from_utf8(text) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => Err(DecodeError::InvalidUtf8 { offset }),
        }
    }

    /// 宽字符串：u32 字节长度 + u16 码元序列，无结尾符
    pub fn read_wstring(&mut self) -> Result<String> {
        let byte_len = self.read_len()?;
        let bytes = self.take(byte_len)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| {
                if self.little_endian {
                    u16::from_le_bytes([pair[0], pair[1]])
                } else {
                    u16::from_be_bytes([pair[0], pair[1]])
                }
            })
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

/// CDR 载荷构造器（小端），用于合成测试夹具
#[derive(Debug, Clone)]
pub struct CdrWriter {
    buf: Vec<u8>,
}

impl CdrWriter {
    pub fn new() -> Self {
        Self {
            buf: vec![0x00, 0x01, 0x00, 0x00],
        }
    }

    fn align(&mut self, size: usize) {
        let misalign = (self.buf.len() - 4) % size;
        if misalign != 0 {
            self.buf.resize(self.buf.len() + size - misalign, 0);
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(u8::from(value));
        self
    }

    write_numeric!(write_u16, u16);
    write_numeric!(write_i16, i16);
    write_numeric!(write_u32, u32);
    write_numeric!(write_i32, i32);
    write_numeric!(write_u64, u64);
    write_numeric!(write_i64, i64);
    write_numeric!(write_f32, f32);
    write_numeric!(write_f64, f64);

    /// 序列长度前缀
    pub fn write_len(&mut self, len: usize) -> &mut Self {
        self.write_u32(len as u32)
    }

    /// 字符串：长度含结尾 NUL
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.write_u32(value.len() as u32 + 1);
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for CdrWriter {
    fn default() -> Self {
        Self::new()
    }
}
