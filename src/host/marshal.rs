//! Host handle <-> generic value conversion
//!
//! | host        | generic                         |
//! |-------------|---------------------------------|
//! | undefined   | null                            |
//! | null        | null                            |
//! | boolean     | bool                            |
//! | number      | f64 (from s8/s16/s32/f32/f64)   |
//! | bigint      | s64                             |
//! | string      | string                          |
//! | array       | array                           |
//! | object      | map (string keys)               |
//! | function    | function reference (by name)    |
//! | symbol      | unsupported                     |
//! | -           | ptr: unsupported                |
//!
//! Neither direction consumes its input.

use std::collections::BTreeMap;

use super::{ConversionError, HostRuntime, HostValue};
use crate::config::Limits;
use crate::value::{FunctionRef, GenericValue, Ledger, Value, ValueKind};

/// Maximum nesting depth in either direction. Host object graphs may be
/// cyclic, so recursion is bounded.
pub const MAX_DEPTH: usize = 64;

/// Convert a borrowed host handle into a new caller-owned generic value,
/// with the default [`Limits`].
pub fn host_to_generic<H: HostRuntime>(
    host: &H,
    ledger: &Ledger,
    handle: H::Handle,
) -> Result<GenericValue, ConversionError> {
    host_to_generic_with_limits(host, ledger, handle, &Limits::default())
}

/// [`host_to_generic`] visiting at most `limits.max_nodes` values.
///
/// Host children may be shared, so a small host graph can expand into a
/// much larger tree. The count is over the expanded tree.
pub fn host_to_generic_with_limits<H: HostRuntime>(
    host: &H,
    ledger: &Ledger,
    handle: H::Handle,
    limits: &Limits,
) -> Result<GenericValue, ConversionError> {
    let mut budget = Budget::new(limits.max_nodes);
    let value = host_to_value(host, handle, 0, &mut budget)?;
    Ok(GenericValue::new(ledger, value))
}

/// Convert a borrowed generic value into a new host-owned handle, with the
/// default [`Limits`].
///
/// The input stays alive; the caller still has to destroy it.
pub fn generic_to_host<H: HostRuntime>(
    host: &mut H,
    value: &GenericValue,
) -> Result<H::Handle, ConversionError> {
    generic_to_host_with_limits(host, value, &Limits::default())
}

/// [`generic_to_host`] creating at most `limits.max_nodes` host values.
pub fn generic_to_host_with_limits<H: HostRuntime>(
    host: &mut H,
    value: &GenericValue,
    limits: &Limits,
) -> Result<H::Handle, ConversionError> {
    let mut budget = Budget::new(limits.max_nodes);
    value_to_host(host, value.value(), 0, &mut budget)
}

/// Work bound for one conversion.
struct Budget {
    visited: usize,
    max_nodes: usize,
}

impl Budget {
    fn new(max_nodes: usize) -> Self {
        Self {
            visited: 0,
            max_nodes,
        }
    }

    fn enter(&mut self, depth: usize) -> Result<(), ConversionError> {
        if depth > MAX_DEPTH {
            return Err(ConversionError::TooDeep(MAX_DEPTH));
        }
        self.visited += 1;
        if self.visited > self.max_nodes {
            return Err(ConversionError::TooManyNodes(self.max_nodes));
        }
        Ok(())
    }
}

fn host_to_value<H: HostRuntime>(
    host: &H,
    handle: H::Handle,
    depth: usize,
    budget: &mut Budget,
) -> Result<Value, ConversionError> {
    budget.enter(depth)?;

    let value = match host.classify(handle)? {
        HostValue::Undefined | HostValue::Null => Value::Null,
        HostValue::Bool(b) => Value::Bool(b),
        HostValue::Number(n) => Value::F64(n),
        HostValue::BigInt(n) => Value::S64(n),
        HostValue::String(s) => Value::String(s),
        HostValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| host_to_value(host, item, depth + 1, budget))
                .collect::<Result<_, _>>()?,
        ),
        HostValue::Object(props) => {
            let mut map = BTreeMap::new();
            for (key, prop) in props {
                map.insert(key, host_to_value(host, prop, depth + 1, budget)?);
            }
            Value::Map(map)
        }
        HostValue::Function(name) => Value::Function(FunctionRef::new(name)),
        other @ HostValue::Symbol => {
            return Err(ConversionError::UnsupportedHostKind(other.kind_name()))
        }
    };
    Ok(value)
}

fn value_to_host<H: HostRuntime>(
    host: &mut H,
    value: &Value,
    depth: usize,
    budget: &mut Budget,
) -> Result<H::Handle, ConversionError> {
    budget.enter(depth)?;

    let host_value = match value {
        Value::Null => HostValue::Null,
        Value::Bool(b) => HostValue::Bool(*b),
        Value::S8(_) | Value::S16(_) | Value::S32(_) | Value::F32(_) | Value::F64(_) => {
            HostValue::Number(value.as_f64().unwrap_or(f64::NAN))
        }
        Value::S64(n) => HostValue::BigInt(*n),
        Value::String(s) => HostValue::String(s.clone()),
        Value::Array(items) => {
            let mut handles = Vec::with_capacity(items.len());
            for item in items {
                handles.push(value_to_host(host, item, depth + 1, budget)?);
            }
            HostValue::Array(handles)
        }
        Value::Map(entries) => {
            let mut props = Vec::with_capacity(entries.len());
            for (key, item) in entries {
                props.push((key.clone(), value_to_host(host, item, depth + 1, budget)?));
            }
            HostValue::Object(props)
        }
        Value::Function(func) => HostValue::Function(func.name.clone()),
        Value::Ptr(_) => return Err(ConversionError::UnsupportedValueKind(ValueKind::Ptr)),
    };
    Ok(host.create(host_value)?)
}
