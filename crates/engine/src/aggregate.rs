//! Quick sum over index keys
//!
//! Numeric index keys embed a fixed-width encoding of the field value, so a
//! sum can be computed from the keys alone without loading any record. The
//! [`Accumulator`] variant decides how many bytes are read and how they are
//! interpreted; the key itself carries no type tag.

use tormenta_core::{Value, ValueKind};

use crate::error::{Error, Result};

/// Running total of one numeric kind
///
/// Integer totals wrap on overflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Accumulator {
    /// Generic signed integer, read as 4 bytes
    Int(i64),
    /// 8-bit signed
    I8(i8),
    /// 16-bit signed
    I16(i16),
    /// 32-bit signed
    I32(i32),
    /// 64-bit signed
    I64(i64),
    /// Generic unsigned integer, read as 4 bytes
    Uint(u64),
    /// 8-bit unsigned
    U8(u8),
    /// 16-bit unsigned
    U16(u16),
    /// 32-bit unsigned
    U32(u32),
    /// 64-bit unsigned
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl Accumulator {
    /// Zero accumulator for `kind`, `None` for non-numeric kinds
    pub fn zero(kind: ValueKind) -> Option<Self> {
        let acc = match kind {
            ValueKind::Int => Accumulator::Int(0),
            ValueKind::I8 => Accumulator::I8(0),
            ValueKind::I16 => Accumulator::I16(0),
            ValueKind::I32 => Accumulator::I32(0),
            ValueKind::I64 => Accumulator::I64(0),
            ValueKind::Uint => Accumulator::Uint(0),
            ValueKind::U8 => Accumulator::U8(0),
            ValueKind::U16 => Accumulator::U16(0),
            ValueKind::U32 => Accumulator::U32(0),
            ValueKind::U64 => Accumulator::U64(0),
            ValueKind::F32 => Accumulator::F32(0.0),
            ValueKind::F64 => Accumulator::F64(0.0),
            ValueKind::Str | ValueKind::Bool | ValueKind::Time | ValueKind::Id => return None,
        };
        Some(acc)
    }

    /// Kind of value this accumulator reads
    pub fn kind(&self) -> ValueKind {
        match self {
            Accumulator::Int(_) => ValueKind::Int,
            Accumulator::I8(_) => ValueKind::I8,
            Accumulator::I16(_) => ValueKind::I16,
            Accumulator::I32(_) => ValueKind::I32,
            Accumulator::I64(_) => ValueKind::I64,
            Accumulator::Uint(_) => ValueKind::Uint,
            Accumulator::U8(_) => ValueKind::U8,
            Accumulator::U16(_) => ValueKind::U16,
            Accumulator::U32(_) => ValueKind::U32,
            Accumulator::U64(_) => ValueKind::U64,
            Accumulator::F32(_) => ValueKind::F32,
            Accumulator::F64(_) => ValueKind::F64,
        }
    }

    /// Decode one encoded value segment and add it
    pub fn add_encoded(&mut self, bytes: &[u8]) -> Result<()> {
        let value = Value::decode(self.kind(), bytes)?;
        match (self, value) {
            (Accumulator::Int(acc), Value::Int(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::I8(acc), Value::I8(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::I16(acc), Value::I16(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::I32(acc), Value::I32(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::I64(acc), Value::I64(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::Uint(acc), Value::Uint(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::U8(acc), Value::U8(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::U16(acc), Value::U16(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::U32(acc), Value::U32(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::U64(acc), Value::U64(v)) => *acc = acc.wrapping_add(v),
            (Accumulator::F32(acc), Value::F32(v)) => *acc += v,
            (Accumulator::F64(acc), Value::F64(v)) => *acc += v,
            (acc, value) => {
                return Err(Error::type_mismatch(format!(
                    "{} accumulator decoded a {} value",
                    acc.kind(),
                    value.kind()
                )))
            }
        }
        Ok(())
    }

    /// Total as a float, whatever the kind
    pub fn as_f64(&self) -> f64 {
        match *self {
            Accumulator::Int(v) | Accumulator::I64(v) => v as f64,
            Accumulator::I8(v) => v as f64,
            Accumulator::I16(v) => v as f64,
            Accumulator::I32(v) => v as f64,
            Accumulator::Uint(v) | Accumulator::U64(v) => v as f64,
            Accumulator::U8(v) => v as f64,
            Accumulator::U16(v) => v as f64,
            Accumulator::U32(v) => v as f64,
            Accumulator::F32(v) => v as f64,
            Accumulator::F64(v) => v,
        }
    }

    /// Total as a signed integer, `None` for floats and out-of-range totals
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Accumulator::Int(v) | Accumulator::I64(v) => Some(v),
            Accumulator::I8(v) => Some(v as i64),
            Accumulator::I16(v) => Some(v as i64),
            Accumulator::I32(v) => Some(v as i64),
            Accumulator::Uint(v) | Accumulator::U64(v) => i64::try_from(v).ok(),
            Accumulator::U8(v) => Some(v as i64),
            Accumulator::U16(v) => Some(v as i64),
            Accumulator::U32(v) => Some(v as i64),
            Accumulator::F32(_) | Accumulator::F64(_) => None,
        }
    }
}
