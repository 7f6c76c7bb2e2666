//! Runtime values: the tagged numeric tower plus embedder-supplied
//! foreign values that participate through capability probes.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

mod arith;
#[cfg(test)]
mod arith_test;

pub use arith::RoundingMode;
pub(crate) use arith::{
    arith_shift, bit_shift, equal, less_equal, less_than, round, to_bits, to_int, to_num,
};

/// Capability probes for embedder-supplied values. A foreign value that
/// answers one of the probes takes part in arithmetic as the matching
/// numeric kind; probes are tried in declaration order. A value answering
/// none of them is opaque: loads and stores are always legal, arithmetic
/// faults.
pub trait ForeignValue: fmt::Debug + Send + Sync {
    fn float64(&self) -> Option<f64> {
        None
    }

    fn int64(&self) -> Option<i64> {
        None
    }

    fn uint64(&self) -> Option<u64> {
        None
    }
}

/// Any value that can appear on the stack, in a register, or in a
/// constants pool. `Empty` is the neutral value: cleared stack slots and
/// untouched registers hold it.
#[derive(Debug, Default, Clone)]
pub enum Value {
    Uint(u64),
    Int(i64),
    Float(f64),
    Foreign(Arc<dyn ForeignValue>),
    #[default]
    Empty,
}

impl Value {
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Uint(_) => "Uint",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Foreign(_) => "Foreign",
            Value::Empty => "Empty",
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Foreign(a), Value::Foreign(b)) => Arc::ptr_eq(a, b),
            (Value::Empty, Value::Empty) => true,
            _ => false,
        }
    }
}

impl From<u64> for Value {
    #[inline]
    fn from(u: u64) -> Self {
        Value::Uint(u)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Uint(u) => write!(f, "{u}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Foreign(obj) => write!(f, "<foreign {obj:?}>"),
            Value::Empty => write!(f, "empty"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            // Foreign values can't be serialized, use a placeholder
            Value::Foreign(_) => serializer.serialize_str("<foreign>"),
            Value::Empty => serializer.serialize_unit(),
        }
    }
}
