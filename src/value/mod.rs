//! Generic values
//!
//! The explicitly-managed side of the bridge. A [`Value`] is plain data over
//! a closed kind set; a [`GenericValue`] is an owned, non-copyable handle to
//! one, accounted for in a [`Ledger`] from creation until it is destroyed.

mod ledger;

pub use ledger::{Ledger, Resource, Token};

use std::collections::BTreeMap;
use std::fmt;

/// Kind discriminator for [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    S8,
    S16,
    S32,
    S64,
    F32,
    F64,
    String,
    Array,
    Map,
    Function,
    Ptr,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::S8 => "s8",
            ValueKind::S16 => "s16",
            ValueKind::S32 => "s32",
            ValueKind::S64 => "s64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Function => "function",
            ValueKind::Ptr => "ptr",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ValueKind::S8 | ValueKind::S16 | ValueKind::S32 | ValueKind::S64)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A callable known to the engine, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub name: String,
}

impl FunctionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A value that can be passed across the call boundary
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),

    // Integers
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),

    // Floating point
    F32(f32),
    F64(f64),

    String(String),

    // Compound
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),

    Function(FunctionRef),
    /// Opaque address owned by the engine
    Ptr(usize),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::S8(_) => ValueKind::S8,
            Value::S16(_) => ValueKind::S16,
            Value::S32(_) => ValueKind::S32,
            Value::S64(_) => ValueKind::S64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::Function(_) => ValueKind::Function,
            Value::Ptr(_) => ValueKind::Ptr,
        }
    }

    /// Widen any integer kind to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::S8(v) => Some(v.into()),
            Value::S16(v) => Some(v.into()),
            Value::S32(v) => Some(v.into()),
            Value::S64(v) => Some(v),
            _ => None,
        }
    }

    /// Widen any numeric kind to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON view of the value. Function references render as their name,
    /// pointers as their address.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::S8(_) | Value::S16(_) | Value::S32(_) | Value::S64(_) => {
                Json::from(self.as_i64().unwrap_or_default())
            }
            Value::F32(v) => Json::from(f64::from(*v)),
            Value::F64(v) => Json::from(*v),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Function(func) => Json::String(format!("<function {}>", func.name)),
            Value::Ptr(addr) => Json::String(format!("<ptr {:#x}>", addr)),
        }
    }

    /// Build a value from JSON. Integral numbers become `S64`, other numbers `F64`.
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::S64(i),
                None => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::S8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::S16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::S32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::S64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Owned handle to a value in the explicitly-managed domain.
///
/// Exactly one owner at a time: not `Clone`, released when dropped or
/// passed to [`GenericValue::destroy`].
pub struct GenericValue {
    value: Value,
    _token: Token,
}

impl GenericValue {
    pub fn new(ledger: &Ledger, value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            _token: ledger.acquire(Resource::Value),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Release the handle, keeping a plain copy of its data.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Release the handle.
    pub fn destroy(self) {}
}

impl fmt::Debug for GenericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GenericValue").field(&self.value).finish()
    }
}
