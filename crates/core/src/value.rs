//! Order-preserving value codec
//!
//! Index keys embed field values as bytes, and range scans rely on the byte
//! order of those encodings matching the natural order of the values:
//!
//! - Signed integers: big-endian two's complement with the sign bit flipped
//! - Unsigned integers: big-endian
//! - Floats: IEEE-754 big-endian; positives get the sign bit flipped,
//!   negatives have every bit inverted
//! - Strings: lower-cased UTF-8
//! - Booleans: a single `0x00` / `0x01` byte
//! - Times: signed unix seconds, encoded like an `i64`
//! - Ids: the raw 16 bytes
//!
//! The generic [`ValueKind::Int`] and [`ValueKind::Uint`] kinds are always
//! written as 4 bytes. Values outside the 32-bit range are truncated, which
//! breaks ordering for them; use the sized kinds for wide values.
//!
//! No type tag is stored: decoding needs the [`ValueKind`] from the schema.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::id::{Id, ID_LEN};

/// Kind of an indexable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Platform-width signed integer, encoded as 4 bytes
    Int,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// Platform-width unsigned integer, encoded as 4 bytes
    Uint,
    /// 8-bit unsigned integer
    U8,
    /// 16-bit unsigned integer
    U16,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// String, case-folded
    Str,
    /// Boolean
    Bool,
    /// UTC timestamp, second precision
    Time,
    /// Entity id
    Id,
}

impl ValueKind {
    /// Encoded width in bytes, `None` for variable-width kinds
    pub fn width(self) -> Option<usize> {
        match self {
            ValueKind::I8 | ValueKind::U8 | ValueKind::Bool => Some(1),
            ValueKind::I16 | ValueKind::U16 => Some(2),
            ValueKind::Int | ValueKind::I32 | ValueKind::Uint | ValueKind::U32 | ValueKind::F32 => {
                Some(4)
            }
            ValueKind::I64 | ValueKind::U64 | ValueKind::F64 | ValueKind::Time => Some(8),
            ValueKind::Id => Some(ID_LEN),
            ValueKind::Str => None,
        }
    }

    /// Whether values of this kind can be summed
    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            ValueKind::Str | ValueKind::Bool | ValueKind::Time | ValueKind::Id
        )
    }

    fn is_float(self) -> bool {
        matches!(self, ValueKind::F32 | ValueKind::F64)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::Uint => "uint",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::Str => "str",
            ValueKind::Bool => "bool",
            ValueKind::Time => "time",
            ValueKind::Id => "id",
        };
        f.write_str(name)
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Platform-width signed integer
    Int(i64),
    /// 8-bit signed integer
    I8(i8),
    /// 16-bit signed integer
    I16(i16),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// Platform-width unsigned integer
    Uint(u64),
    /// 8-bit unsigned integer
    U8(u8),
    /// 16-bit unsigned integer
    U16(u16),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// String
    Str(String),
    /// Boolean
    Bool(bool),
    /// UTC timestamp
    Time(DateTime<Utc>),
    /// Entity id
    Id(Id),
}

impl Value {
    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::I8(_) => ValueKind::I8,
            Value::I16(_) => ValueKind::I16,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::Uint(_) => ValueKind::Uint,
            Value::U8(_) => ValueKind::U8,
            Value::U16(_) => ValueKind::U16,
            Value::U32(_) => ValueKind::U32,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Time(_) => ValueKind::Time,
            Value::Id(_) => ValueKind::Id,
        }
    }

    /// Encode into order-preserving bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::Int(v) => encode_i32(*v as i32).to_vec(),
            Value::I8(v) => vec![(*v as u8) ^ 0x80],
            Value::I16(v) => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, (*v as u16) ^ 0x8000);
                buf.to_vec()
            }
            Value::I32(v) => encode_i32(*v).to_vec(),
            Value::I64(v) => encode_i64(*v).to_vec(),
            Value::Uint(v) => encode_u32(*v as u32).to_vec(),
            Value::U8(v) => vec![*v],
            Value::U16(v) => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, *v);
                buf.to_vec()
            }
            Value::U32(v) => encode_u32(*v).to_vec(),
            Value::U64(v) => {
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, *v);
                buf.to_vec()
            }
            Value::F32(v) => {
                let bits = v.to_bits();
                let flipped = if bits & 0x8000_0000 != 0 {
                    !bits
                } else {
                    bits ^ 0x8000_0000
                };
                encode_u32(flipped).to_vec()
            }
            Value::F64(v) => {
                let bits = v.to_bits();
                let flipped = if bits & 0x8000_0000_0000_0000 != 0 {
                    !bits
                } else {
                    bits ^ 0x8000_0000_0000_0000
                };
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, flipped);
                buf.to_vec()
            }
            Value::Str(s) => s.to_lowercase().into_bytes(),
            Value::Bool(b) => vec![u8::from(*b)],
            Value::Time(t) => encode_i64(t.timestamp()).to_vec(),
            Value::Id(id) => id.as_bytes().to_vec(),
        }
    }

    /// Decode bytes written by [`Value::encode`]
    ///
    /// Strings come back lower-cased since the encoding is case-folded.
    pub fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Value, CodecError> {
        if let Some(expected) = kind.width() {
            if bytes.len() != expected {
                return Err(CodecError::WrongWidth {
                    kind,
                    expected,
                    actual: bytes.len(),
                });
            }
        }

        let value = match kind {
            ValueKind::Int => Value::Int(decode_i32(bytes) as i64),
            ValueKind::I8 => Value::I8((bytes[0] ^ 0x80) as i8),
            ValueKind::I16 => Value::I16((BigEndian::read_u16(bytes) ^ 0x8000) as i16),
            ValueKind::I32 => Value::I32(decode_i32(bytes)),
            ValueKind::I64 => Value::I64(decode_i64(bytes)),
            ValueKind::Uint => Value::Uint(BigEndian::read_u32(bytes) as u64),
            ValueKind::U8 => Value::U8(bytes[0]),
            ValueKind::U16 => Value::U16(BigEndian::read_u16(bytes)),
            ValueKind::U32 => Value::U32(BigEndian::read_u32(bytes)),
            ValueKind::U64 => Value::U64(BigEndian::read_u64(bytes)),
            ValueKind::F32 => {
                let bits = BigEndian::read_u32(bytes);
                let bits = if bits & 0x8000_0000 != 0 {
                    bits ^ 0x8000_0000
                } else {
                    !bits
                };
                Value::F32(f32::from_bits(bits))
            }
            ValueKind::F64 => {
                let bits = BigEndian::read_u64(bytes);
                let bits = if bits & 0x8000_0000_0000_0000 != 0 {
                    bits ^ 0x8000_0000_0000_0000
                } else {
                    !bits
                };
                Value::F64(f64::from_bits(bits))
            }
            ValueKind::Str => Value::Str(
                String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)?,
            ),
            ValueKind::Bool => match bytes[0] {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(CodecError::InvalidBool(other)),
            },
            ValueKind::Time => {
                let secs = decode_i64(bytes);
                let time = Utc
                    .timestamp_opt(secs, 0)
                    .single()
                    .ok_or(CodecError::InvalidTime(secs))?;
                Value::Time(time)
            }
            ValueKind::Id => {
                let id = Id::from_slice(bytes).ok_or(CodecError::WrongWidth {
                    kind,
                    expected: ID_LEN,
                    actual: bytes.len(),
                })?;
                Value::Id(id)
            }
        };
        Ok(value)
    }

    /// Convert into `kind`, as needed before encoding a query predicate
    ///
    /// Numbers convert between kinds when the value fits the target (the
    /// generic `Int`/`Uint` kinds accept any 64-bit value and truncate on
    /// encode). Strings parse into numbers, booleans (`true`, `t`, `false`,
    /// `f`), RFC 3339 times and ids. Anything converts into a string.
    pub fn coerce(self, kind: ValueKind) -> Result<Value, CodecError> {
        if self.kind() == kind {
            return Ok(self);
        }
        let mismatch = |value: &Value| CodecError::Coercion {
            value: value.to_string(),
            kind,
        };

        if kind == ValueKind::Str {
            return Ok(Value::Str(self.to_string()));
        }

        if let Value::Str(s) = &self {
            let trimmed = s.trim();
            let parsed = match kind {
                ValueKind::Bool => match trimmed.to_lowercase().as_str() {
                    "true" | "t" => Some(Value::Bool(true)),
                    "false" | "f" => Some(Value::Bool(false)),
                    _ => None,
                },
                ValueKind::Time => DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|t| Value::Time(t.with_timezone(&Utc))),
                ValueKind::Id => trimmed.parse::<Id>().ok().map(Value::Id),
                k if k.is_float() => trimmed.parse::<f64>().ok().map(Value::F64),
                _ => trimmed.parse::<i128>().ok().map(Value::integer),
            };
            return match parsed {
                Some(v) => v.coerce(kind).map_err(|_| mismatch(&self)),
                None => Err(mismatch(&self)),
            };
        }

        if kind.is_float() {
            let f = self.as_f64().ok_or_else(|| mismatch(&self))?;
            return Ok(match kind {
                ValueKind::F32 => Value::F32(f as f32),
                _ => Value::F64(f),
            });
        }

        if kind.is_numeric() {
            let i = self.as_i128().ok_or_else(|| mismatch(&self))?;
            let converted = match kind {
                ValueKind::Int => i64::try_from(i).ok().map(Value::Int),
                ValueKind::I8 => i8::try_from(i).ok().map(Value::I8),
                ValueKind::I16 => i16::try_from(i).ok().map(Value::I16),
                ValueKind::I32 => i32::try_from(i).ok().map(Value::I32),
                ValueKind::I64 => i64::try_from(i).ok().map(Value::I64),
                ValueKind::Uint => u64::try_from(i).ok().map(Value::Uint),
                ValueKind::U8 => u8::try_from(i).ok().map(Value::U8),
                ValueKind::U16 => u16::try_from(i).ok().map(Value::U16),
                ValueKind::U32 => u32::try_from(i).ok().map(Value::U32),
                ValueKind::U64 => u64::try_from(i).ok().map(Value::U64),
                _ => None,
            };
            return converted.ok_or_else(|| mismatch(&self));
        }

        Err(mismatch(&self))
    }

    /// Integer view of a numeric value; floats only when they are whole
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) | Value::I64(v) => Some(*v as i128),
            Value::I8(v) => Some(*v as i128),
            Value::I16(v) => Some(*v as i128),
            Value::I32(v) => Some(*v as i128),
            Value::Uint(v) | Value::U64(v) => Some(*v as i128),
            Value::U8(v) => Some(*v as i128),
            Value::U16(v) => Some(*v as i128),
            Value::U32(v) => Some(*v as i128),
            Value::F32(v) if v.fract() == 0.0 => Some(*v as i128),
            Value::F64(v) if v.fract() == 0.0 => Some(*v as i128),
            _ => None,
        }
    }

    /// Float view of a numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            other => other.as_i128().map(|i| i as f64),
        }
    }

    fn integer(i: i128) -> Value {
        match i64::try_from(i) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::U64(i as u64),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) | Value::I64(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::Uint(v) | Value::U64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Id(id) => write!(f, "{}", id),
        }
    }
}

fn encode_i32(v: i32) -> [u8; 4] {
    encode_u32((v as u32) ^ 0x8000_0000)
}

fn encode_u32(v: u32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, v);
    buf
}

fn encode_i64(v: i64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, (v as u64) ^ 0x8000_0000_0000_0000);
    buf
}

fn decode_i32(bytes: &[u8]) -> i32 {
    (BigEndian::read_u32(bytes) ^ 0x8000_0000) as i32
}

fn decode_i64(bytes: &[u8]) -> i64 {
    (BigEndian::read_u64(bytes) ^ 0x8000_0000_0000_0000) as i64
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
    bool => Bool,
    DateTime<Utc> => Time,
    Id => Id,
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}
