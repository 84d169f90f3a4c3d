//! Dynamic property values.
//!
//! Node properties, instruction payloads, and event payloads all carry
//! [`Value`] - a small JSON-like dynamic: booleans, numbers, strings,
//! arrays, maps, and shared float32 buffers.
//!
//! Equality is *shallow* in the sense the reconciler needs for diffing:
//! numbers compare bitwise (so `NaN == NaN`, and a re-set NaN does not
//! re-emit every render) and float32 buffers compare by pointer identity,
//! never by contents.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::resource::SharedBuffer;

/// A property bag: string keys to dynamic values, in sorted key order.
///
/// `BTreeMap` iteration order is what makes the canonical hash encoding
/// (see [`canonical_props`](crate::hash::canonical_props)) deterministic.
pub type Props = BTreeMap<String, Value>;

/// Builds a [`Props`] map from key/value pairs.
///
/// ```rust
/// use arbor_core::{Value, props};
///
/// let p = props([("value", Value::from(440.0)), ("key", Value::from("fq"))]);
/// assert_eq!(p.get("value"), Some(&Value::from(440.0)));
/// ```
pub fn props<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Props
where
    K: Into<String>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A JSON-like dynamic value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Double-precision number. Integers ride along as whole floats.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// String-keyed map, sorted by key.
    Map(Props),
    /// Shared immutable float32 buffer (sample data, tables).
    Float32(SharedBuffer),
}

impl Value {
    /// Returns the number, if this is a [`Value::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the array, if this is a [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the map, if this is a [`Value::Map`].
    pub fn as_map(&self) -> Option<&Props> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the buffer, if this is a [`Value::Float32`].
    pub fn as_float32(&self) -> Option<&SharedBuffer> {
        match self {
            Value::Float32(b) => Some(b),
            _ => None,
        }
    }

    /// True when this is a number that is NaN or infinite.
    ///
    /// The reconciler warns on (but still forwards) such values.
    pub fn is_non_finite_number(&self) -> bool {
        matches!(self, Value::Number(n) if !n.is_finite())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            // Bitwise: NaN equals NaN, and -0.0 differs from 0.0. Diff
            // stability matters more here than IEEE semantics.
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(String::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Props> for Value {
    fn from(v: Props) -> Self {
        Value::Map(v)
    }
}

impl From<SharedBuffer> for Value {
    fn from(v: SharedBuffer) -> Self {
        Value::Float32(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::Float32(SharedBuffer::from(v))
    }
}
