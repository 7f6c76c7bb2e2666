//! The arithmetic value tower: coercion of runtime values into working
//! numeric kinds, binary/bitwise operations, shifts, rounding, and the
//! comparisons backing `test`.
//!
//! The result tag of a binary operation is decided by the LEFT operand;
//! the right operand is coerced to the left's kind first. Bitwise and
//! shift operations route both sides through an integer kind. All integer
//! arithmetic wraps.

use std::fmt;

use serde::Serialize;

use crate::vm::Fault;

use super::{ForeignValue, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum RoundingMode {
    Truncate = 0,
    Nearest = 1,
    Floor = 2,
    Ceil = 3,
}

impl RoundingMode {
    pub(crate) fn from_raw(raw: u32) -> Result<Self, Fault> {
        match raw {
            0 => Ok(RoundingMode::Truncate),
            1 => Ok(RoundingMode::Nearest),
            2 => Ok(RoundingMode::Floor),
            3 => Ok(RoundingMode::Ceil),
            _ => Err(Fault::InvalidRoundingMode(raw)),
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundingMode::Truncate => "trunc",
            RoundingMode::Nearest => "nearest",
            RoundingMode::Floor => "floor",
            RoundingMode::Ceil => "ceil",
        };
        write!(f, "{name}")
    }
}

/// A value coerced for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Uint(u64),
    Int(i64),
    Float(f64),
}

/// A value coerced for bitwise work. Floats truncate into `Int` on the
/// way in; the tag survives to the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bits {
    Uint(u64),
    Int(i64),
}

pub(crate) fn to_num(v: &Value) -> Result<Num, Fault> {
    match v {
        Value::Uint(u) => Ok(Num::Uint(*u)),
        Value::Int(i) => Ok(Num::Int(*i)),
        Value::Float(f) => Ok(Num::Float(*f)),
        Value::Foreign(obj) => probe(obj.as_ref()).ok_or(Fault::TypeFault(v.type_name())),
        Value::Empty => Err(Fault::TypeFault(v.type_name())),
    }
}

fn probe(obj: &dyn ForeignValue) -> Option<Num> {
    if let Some(f) = obj.float64() {
        Some(Num::Float(f))
    } else if let Some(i) = obj.int64() {
        Some(Num::Int(i))
    } else {
        obj.uint64().map(Num::Uint)
    }
}

pub(crate) fn to_bits(v: &Value) -> Result<Bits, Fault> {
    Ok(match to_num(v)? {
        Num::Uint(u) => Bits::Uint(u),
        Num::Int(i) => Bits::Int(i),
        Num::Float(f) => Bits::Int(f as i64),
    })
}

pub(crate) fn to_int(v: &Value) -> Result<i64, Fault> {
    Ok(to_num(v)?.as_i64())
}

impl Num {
    #[inline]
    fn as_f64(self) -> f64 {
        match self {
            Num::Uint(u) => u as f64,
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    #[inline]
    fn as_i64(self) -> i64 {
        match self {
            Num::Uint(u) => u as i64,
            Num::Int(i) => i,
            Num::Float(f) => f as i64,
        }
    }

    #[inline]
    fn as_u64(self) -> u64 {
        match self {
            Num::Uint(u) => u,
            Num::Int(i) => i as u64,
            Num::Float(f) => f as u64,
        }
    }

    pub(crate) fn add(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Float(a), b) => Num::Float(a + b.as_f64()),
            (a, Num::Float(b)) => Num::Float(a.as_f64() + b),
            (Num::Uint(a), b) => Num::Uint(a.wrapping_add(b.as_u64())),
            (Num::Int(a), b) => Num::Int(a.wrapping_add(b.as_i64())),
        }
    }

    pub(crate) fn sub(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Float(a), b) => Num::Float(a - b.as_f64()),
            (a, Num::Float(b)) => Num::Float(a.as_f64() - b),
            (Num::Uint(a), b) => Num::Uint(a.wrapping_sub(b.as_u64())),
            (Num::Int(a), b) => Num::Int(a.wrapping_sub(b.as_i64())),
        }
    }

    pub(crate) fn mul(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Float(a), b) => Num::Float(a * b.as_f64()),
            (a, Num::Float(b)) => Num::Float(a.as_f64() * b),
            // Uint*Uint lands in Int, matching div and mod below.
            (Num::Uint(a), Num::Uint(b)) => Num::Int(a.wrapping_mul(b) as i64),
            (Num::Uint(a), b) => Num::Uint(a.wrapping_mul(b.as_u64())),
            (Num::Int(a), b) => Num::Int(a.wrapping_mul(b.as_i64())),
        }
    }

    pub(crate) fn div(self, rhs: Num) -> Result<Num, Fault> {
        Ok(match (self, rhs) {
            (Num::Float(a), b) => Num::Float(a / b.as_f64()),
            (a, Num::Float(b)) => Num::Float(a.as_f64() / b),
            (Num::Uint(a), Num::Uint(b)) => Num::Int(a.wrapping_div(nonzero_u(b)?) as i64),
            (Num::Uint(a), b) => Num::Uint((a as i64).wrapping_div(nonzero_i(b.as_i64())?) as u64),
            (Num::Int(a), b) => Num::Int(a.wrapping_div(nonzero_i(b.as_i64())?)),
        })
    }

    pub(crate) fn rem(self, rhs: Num) -> Result<Num, Fault> {
        Ok(match (self, rhs) {
            (Num::Float(a), b) => Num::Float(a % b.as_f64()),
            (a, Num::Float(b)) => Num::Float(a.as_f64() % b),
            (Num::Uint(a), Num::Uint(b)) => Num::Int(a.wrapping_rem(nonzero_u(b)?) as i64),
            (Num::Uint(a), b) => Num::Uint((a as i64).wrapping_rem(nonzero_i(b.as_i64())?) as u64),
            (Num::Int(a), b) => Num::Int(a.wrapping_rem(nonzero_i(b.as_i64())?)),
        })
    }

    pub(crate) fn neg(self) -> Num {
        match self {
            Num::Uint(u) => Num::Uint(u.wrapping_neg()),
            Num::Int(i) => Num::Int(i.wrapping_neg()),
            Num::Float(f) => Num::Float(-f),
        }
    }

    pub(crate) fn pow(self, rhs: Num) -> Num {
        match (self, rhs) {
            (Num::Float(a), e) => Num::Float(a.powf(e.as_f64())),
            (a, Num::Float(e)) => Num::Float(a.as_f64().powf(e)),
            (a, Num::Int(e)) if e < 0 => Num::Float(a.as_f64().powf(e as f64)),
            (_, Num::Int(0)) | (_, Num::Uint(0)) => Num::Uint(1),
            (Num::Uint(a), Num::Int(e)) => Num::Uint(ipow_u(a, e as u64)),
            (Num::Uint(a), Num::Uint(e)) => Num::Uint(ipow_u(a, e)),
            (Num::Int(a), Num::Int(e)) => Num::Int(ipow_i(a, e as u64)),
            (Num::Int(a), Num::Uint(e)) => Num::Int(ipow_i(a, e)),
        }
    }

    /// Square root in binary64, truncated back to the receiver's tag.
    pub(crate) fn sqrt(self) -> Num {
        match self {
            Num::Uint(u) => Num::Uint((u as f64).sqrt() as u64),
            Num::Int(i) => Num::Int((i as f64).sqrt() as i64),
            Num::Float(f) => Num::Float(f.sqrt()),
        }
    }
}

fn ipow_u(base: u64, exp: u64) -> u64 {
    let mut acc = base;
    for _ in 1..exp {
        acc = acc.wrapping_mul(base);
    }
    acc
}

fn ipow_i(base: i64, exp: u64) -> i64 {
    let mut acc = base;
    for _ in 1..exp {
        acc = acc.wrapping_mul(base);
    }
    acc
}

#[inline]
fn nonzero_u(b: u64) -> Result<u64, Fault> {
    if b == 0 {
        return Err(Fault::DivisionByZero);
    }
    Ok(b)
}

#[inline]
fn nonzero_i(b: i64) -> Result<i64, Fault> {
    if b == 0 {
        return Err(Fault::DivisionByZero);
    }
    Ok(b)
}

impl Bits {
    #[inline]
    fn as_u64(self) -> u64 {
        match self {
            Bits::Uint(u) => u,
            Bits::Int(i) => i as u64,
        }
    }

    #[inline]
    fn with_bits(self, bits: u64) -> Bits {
        match self {
            Bits::Uint(_) => Bits::Uint(bits),
            Bits::Int(_) => Bits::Int(bits as i64),
        }
    }

    pub(crate) fn and(self, rhs: Bits) -> Bits {
        self.with_bits(self.as_u64() & rhs.as_u64())
    }

    pub(crate) fn or(self, rhs: Bits) -> Bits {
        self.with_bits(self.as_u64() | rhs.as_u64())
    }

    pub(crate) fn xor(self, rhs: Bits) -> Bits {
        self.with_bits(self.as_u64() ^ rhs.as_u64())
    }

    pub(crate) fn not(self) -> Bits {
        self.with_bits(!self.as_u64())
    }
}

impl From<Num> for Value {
    fn from(n: Num) -> Value {
        match n {
            Num::Uint(u) => Value::Uint(u),
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

impl From<Bits> for Value {
    fn from(b: Bits) -> Value {
        match b {
            Bits::Uint(u) => Value::Uint(u),
            Bits::Int(i) => Value::Int(i),
        }
    }
}

/// Sign-preserving shift by a signed count: positive counts shift right,
/// negative counts shift left by the magnitude. `Uint` operands are
/// reinterpreted as signed for the duration of the shift.
pub(crate) fn arith_shift(v: &Value, bits: &Value) -> Result<Value, Fault> {
    let count = to_int(bits)?;
    match v {
        Value::Uint(u) => Ok(Value::Uint(shift_signed(*u as i64, count) as u64)),
        Value::Int(i) => Ok(Value::Int(shift_signed(*i, count))),
        // One coercion through the bitwise kind, then give up.
        other => Ok(match to_bits(other)? {
            Bits::Uint(u) => Value::Uint(shift_signed(u as i64, count) as u64),
            Bits::Int(i) => Value::Int(shift_signed(i, count)),
        }),
    }
}

/// Logical shift by a signed count: zero-extending in both directions.
/// `Int` operands are reinterpreted as unsigned for the duration.
pub(crate) fn bit_shift(v: &Value, bits: &Value) -> Result<Value, Fault> {
    let count = to_int(bits)?;
    match v {
        Value::Uint(u) => Ok(Value::Uint(shift_unsigned(*u, count))),
        Value::Int(i) => Ok(Value::Int(shift_unsigned(*i as u64, count) as i64)),
        other => Ok(match to_bits(other)? {
            Bits::Uint(u) => Value::Uint(shift_unsigned(u, count)),
            Bits::Int(i) => Value::Int(shift_unsigned(i as u64, count) as i64),
        }),
    }
}

fn shift_signed(v: i64, count: i64) -> i64 {
    if count < 0 {
        let n = count.unsigned_abs();
        if n >= 64 { 0 } else { v << n as u32 }
    } else if count > 0 {
        if count >= 64 { v >> 63 } else { v >> count as u32 }
    } else {
        v
    }
}

fn shift_unsigned(v: u64, count: i64) -> u64 {
    if count < 0 {
        let n = count.unsigned_abs();
        if n >= 64 { 0 } else { v << n as u32 }
    } else if count > 0 {
        if count >= 64 { 0 } else { v >> count as u32 }
    } else {
        v
    }
}

/// Rounds float-tagged values according to `mode`; integer tags pass
/// through untouched. `Nearest` is round-half-away-from-zero.
pub(crate) fn round(v: &Value, mode: RoundingMode) -> Result<Value, Fault> {
    Ok(match to_num(v)? {
        Num::Uint(u) => Value::Uint(u),
        Num::Int(i) => Value::Int(i),
        Num::Float(x) => Value::Float(match mode {
            RoundingMode::Truncate => x.trunc(),
            RoundingMode::Nearest => (x + 0.5f64.copysign(x)).trunc(),
            RoundingMode::Floor => x.floor(),
            RoundingMode::Ceil => x.ceil(),
        }),
    })
}

// Comparisons promote to binary64 when either side is a float; otherwise
// the left operand's signedness wins and the right operand is
// reinterpreted, consistent with the arithmetic promotion above.

pub(crate) fn less_than(a: &Value, b: &Value) -> Result<bool, Fault> {
    Ok(match (to_num(a)?, to_num(b)?) {
        (Num::Float(x), y) => x < y.as_f64(),
        (x, Num::Float(y)) => x.as_f64() < y,
        (Num::Uint(x), y) => x < y.as_u64(),
        (Num::Int(x), y) => x < y.as_i64(),
    })
}

pub(crate) fn less_equal(a: &Value, b: &Value) -> Result<bool, Fault> {
    Ok(match (to_num(a)?, to_num(b)?) {
        (Num::Float(x), y) => x <= y.as_f64(),
        (x, Num::Float(y)) => x.as_f64() <= y,
        (Num::Uint(x), y) => x <= y.as_u64(),
        (Num::Int(x), y) => x <= y.as_i64(),
    })
}

pub(crate) fn equal(a: &Value, b: &Value) -> Result<bool, Fault> {
    Ok(match (to_num(a)?, to_num(b)?) {
        (Num::Float(x), y) => x == y.as_f64(),
        (x, Num::Float(y)) => x.as_f64() == y,
        (Num::Uint(x), y) => x == y.as_u64(),
        (Num::Int(x), y) => x == y.as_i64(),
    })
}
