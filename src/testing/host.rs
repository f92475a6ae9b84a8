//! In-memory host runtime.

use crate::host::{HostError, HostRuntime, HostValue};

/// Index of a value in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

/// A host runtime that keeps every value in an append-only arena and
/// records raised errors.
#[derive(Debug, Default)]
pub struct MemoryHost {
    slots: Vec<HostValue<Handle>>,
    errors: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, value: HostValue<Handle>) -> Handle {
        let handle = Handle(self.slots.len() as u32);
        self.slots.push(value);
        handle
    }

    pub fn get(&self, handle: Handle) -> Result<&HostValue<Handle>, HostError> {
        self.slots
            .get(handle.0 as usize)
            .ok_or_else(|| HostError(format!("stale handle {}", handle.0)))
    }

    pub fn undefined(&mut self) -> Handle {
        self.alloc(HostValue::Undefined)
    }

    pub fn null(&mut self) -> Handle {
        self.alloc(HostValue::Null)
    }

    pub fn bool(&mut self, value: bool) -> Handle {
        self.alloc(HostValue::Bool(value))
    }

    pub fn number(&mut self, value: f64) -> Handle {
        self.alloc(HostValue::Number(value))
    }

    pub fn bigint(&mut self, value: i64) -> Handle {
        self.alloc(HostValue::BigInt(value))
    }

    pub fn string(&mut self, value: &str) -> Handle {
        self.alloc(HostValue::String(value.to_string()))
    }

    pub fn array(&mut self, items: Vec<Handle>) -> Handle {
        self.alloc(HostValue::Array(items))
    }

    pub fn object(&mut self, props: Vec<(&str, Handle)>) -> Handle {
        let props = props.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        self.alloc(HostValue::Object(props))
    }

    pub fn function(&mut self, name: &str) -> Handle {
        self.alloc(HostValue::Function(name.to_string()))
    }

    pub fn symbol(&mut self) -> Handle {
        self.alloc(HostValue::Symbol)
    }

    /// Number of values ever allocated.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Errors raised so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Take the most recent raised error.
    pub fn take_error(&mut self) -> Option<String> {
        self.errors.pop()
    }

    /// Build a host value from JSON. Integral numbers stay numbers.
    pub fn from_json(&mut self, json: &serde_json::Value) -> Handle {
        use serde_json::Value as Json;
        let value = match json {
            Json::Null => HostValue::Null,
            Json::Bool(b) => HostValue::Bool(*b),
            Json::Number(n) => HostValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => HostValue::String(s.clone()),
            Json::Array(items) => {
                HostValue::Array(items.iter().map(|item| self.from_json(item)).collect())
            }
            Json::Object(entries) => HostValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.from_json(v)))
                    .collect(),
            ),
        };
        self.alloc(value)
    }

    /// JSON view of a host value. Unrepresentable kinds render as strings.
    pub fn to_json(&self, handle: Handle) -> serde_json::Value {
        use serde_json::Value as Json;
        match self.get(handle) {
            Ok(HostValue::Undefined) | Ok(HostValue::Null) => Json::Null,
            Ok(HostValue::Bool(b)) => Json::Bool(*b),
            Ok(HostValue::Number(n)) => Json::from(*n),
            Ok(HostValue::BigInt(n)) => Json::from(*n),
            Ok(HostValue::String(s)) => Json::String(s.clone()),
            Ok(HostValue::Array(items)) => {
                Json::Array(items.iter().map(|item| self.to_json(*item)).collect())
            }
            Ok(HostValue::Object(props)) => Json::Object(
                props
                    .iter()
                    .map(|(k, v)| (k.clone(), self.to_json(*v)))
                    .collect(),
            ),
            Ok(HostValue::Function(name)) => Json::String(format!("<function {}>", name)),
            Ok(HostValue::Symbol) => Json::String("<symbol>".to_string()),
            Err(_) => Json::Null,
        }
    }

    fn display_string(&self, handle: Handle, depth: usize) -> Result<String, HostError> {
        let text = match self.get(handle)? {
            HostValue::Undefined => "undefined".to_string(),
            HostValue::Null => "null".to_string(),
            HostValue::Bool(b) => b.to_string(),
            HostValue::Number(n) => format_number(*n),
            HostValue::BigInt(n) => n.to_string(),
            HostValue::String(s) => s.clone(),
            HostValue::Array(items) => {
                if depth > crate::host::MAX_DEPTH {
                    return Err(HostError("array nesting too deep".into()));
                }
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    // Holes and nullish elements join as empty strings.
                    match self.get(*item)? {
                        HostValue::Undefined | HostValue::Null => parts.push(String::new()),
                        _ => parts.push(self.display_string(*item, depth + 1)?),
                    }
                }
                parts.join(",")
            }
            HostValue::Object(_) => "[object Object]".to_string(),
            HostValue::Function(name) => format!("function {}() {{ [native code] }}", name),
            HostValue::Symbol => {
                return Err(HostError("cannot convert a symbol to a string".into()))
            }
        };
        Ok(text)
    }

    fn string_ref(&self, handle: Handle) -> Result<&str, HostError> {
        match self.get(handle)? {
            HostValue::String(s) => Ok(s),
            other => Err(HostError(format!("expected string, got {}", other.kind_name()))),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl HostRuntime for MemoryHost {
    type Handle = Handle;

    fn classify(&self, handle: Handle) -> Result<HostValue<Handle>, HostError> {
        self.get(handle).cloned()
    }

    fn create(&mut self, value: HostValue<Handle>) -> Result<Handle, HostError> {
        Ok(self.alloc(value))
    }

    fn utf8_len(&self, handle: Handle) -> Result<usize, HostError> {
        Ok(self.string_ref(handle)?.len())
    }

    fn read_utf8(&self, handle: Handle, buf: &mut [u8]) -> Result<usize, HostError> {
        let s = self.string_ref(handle)?;
        if buf.is_empty() {
            return Ok(0);
        }
        let mut n = s.len().min(buf.len() - 1);
        while !s.is_char_boundary(n) {
            n -= 1;
        }
        buf[..n].copy_from_slice(&s.as_bytes()[..n]);
        buf[n] = 0;
        Ok(n)
    }

    fn coerce_to_string(&mut self, handle: Handle) -> Result<Handle, HostError> {
        if let HostValue::String(_) = self.get(handle)? {
            return Ok(handle);
        }
        let text = self.display_string(handle, 0)?;
        Ok(self.alloc(HostValue::String(text)))
    }

    fn array_len(&self, handle: Handle) -> Result<u32, HostError> {
        match self.get(handle)? {
            HostValue::Array(items) => Ok(items.len() as u32),
            other => Err(HostError(format!("expected array, got {}", other.kind_name()))),
        }
    }

    fn array_get(&self, handle: Handle, index: u32) -> Result<Handle, HostError> {
        match self.get(handle)? {
            HostValue::Array(items) => items
                .get(index as usize)
                .copied()
                .ok_or_else(|| HostError(format!("index {} out of bounds", index))),
            other => Err(HostError(format!("expected array, got {}", other.kind_name()))),
        }
    }

    fn throw_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
