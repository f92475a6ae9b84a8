//! In-memory dispatch engine.

use std::collections::BTreeMap;
use std::fmt;

use callbridge_log::{Level, LogPolicy, Logger};
use serde::Serialize;
use tracing::warn;

use crate::engine::{AllocBuf, Allocator, DispatchEngine, EngineError, NativeString};
use crate::value::{GenericValue, Ledger, Value};

/// A callable registered with a [`MemoryEngine`].
pub type NativeFn = Box<dyn FnMut(&[Value]) -> Result<Option<Value>, String>>;

/// One `load_from_file` call as the engine received it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadRecord {
    pub tag: String,
    pub paths: Vec<String>,
}

#[derive(Serialize)]
struct Description<'a> {
    functions: Vec<&'a str>,
    loaded: &'a [LoadRecord],
}

/// Engine with functions registered from Rust closures.
///
/// Loading records the request instead of executing sources; the status it
/// returns is configurable.
pub struct MemoryEngine {
    ledger: Ledger,
    initialized: bool,
    fail_init: bool,
    functions: BTreeMap<String, NativeFn>,
    loads: Vec<LoadRecord>,
    load_status: i32,
    logger: Logger,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            ledger: Ledger::new(),
            initialized: false,
            fail_init: false,
            functions: BTreeMap::new(),
            loads: Vec::new(),
            load_status: 0,
            logger: Logger::new(Level::Debug),
        }
    }

    /// Engine with `add`, `concat` and `echo` registered.
    pub fn with_builtins() -> Self {
        let mut engine = Self::new();
        engine.register("add", builtin_add);
        engine.register("concat", builtin_concat);
        engine.register("echo", |args| Ok(args.first().cloned()));
        engine
    }

    pub fn register<F>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: FnMut(&[Value]) -> Result<Option<Value>, String> + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(func));
        self
    }

    /// Make the next `initialize` fail.
    pub fn fail_initialization(&mut self) -> &mut Self {
        self.fail_init = true;
        self
    }

    pub fn set_load_status(&mut self, status: i32) -> &mut Self {
        self.load_status = status;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn loads(&self) -> &[LoadRecord] {
        &self.loads
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn log(&mut self, level: Level, message: &str) {
        if let Err(err) = self.logger.log(level, "engine", message) {
            warn!(error = %err, "engine log write failed");
        }
    }
}

impl fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("loads", &self.loads)
            .field("ledger", &self.ledger)
            .finish()
    }
}

fn builtin_add(args: &[Value]) -> Result<Option<Value>, String> {
    if args.iter().all(|arg| arg.as_i64().is_some()) {
        let sum = args
            .iter()
            .filter_map(Value::as_i64)
            .try_fold(0i64, |acc, n| acc.checked_add(n))
            .ok_or("integer overflow")?;
        return Ok(Some(Value::S64(sum)));
    }
    let mut sum = 0.0;
    for arg in args {
        sum += arg
            .as_f64()
            .ok_or_else(|| format!("add: expected number, got {}", arg.kind()))?;
    }
    Ok(Some(Value::F64(sum)))
}

fn builtin_concat(args: &[Value]) -> Result<Option<Value>, String> {
    let mut out = String::new();
    for arg in args {
        out.push_str(
            arg.as_str()
                .ok_or_else(|| format!("concat: expected string, got {}", arg.kind()))?,
        );
    }
    Ok(Some(Value::String(out)))
}

impl DispatchEngine for MemoryEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        if self.fail_init {
            return Err(EngineError::Initialization("startup disabled".into()));
        }
        self.initialized = true;
        Ok(())
    }

    fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn call_by_name(
        &mut self,
        name: &str,
        args: &[GenericValue],
    ) -> Result<Option<GenericValue>, EngineError> {
        self.log(Level::Debug, &format!("call {} ({} args)", name, args.len()));

        let func = self
            .functions
            .get_mut(name)
            .ok_or_else(|| EngineError::FunctionNotFound(name.to_string()))?;
        let values: Vec<Value> = args.iter().map(|arg| arg.value().clone()).collect();
        let ret = func(&values).map_err(|message| EngineError::CallFailed {
            name: name.to_string(),
            message,
        })?;

        Ok(ret.map(|value| GenericValue::new(&self.ledger, value)))
    }

    fn load_from_file(&mut self, tag: &str, paths: &[NativeString]) -> i32 {
        let record = LoadRecord {
            tag: tag.to_string(),
            paths: paths.iter().map(|p| p.as_str().to_string()).collect(),
        };
        self.log(
            Level::Info,
            &format!("load {} ({} files)", record.tag, record.paths.len()),
        );
        if self.load_status == 0 {
            self.loads.push(record);
        }
        self.load_status
    }

    fn self_describe(&mut self, allocator: &dyn Allocator) -> Option<AllocBuf> {
        let description = Description {
            functions: self.functions.keys().map(String::as_str).collect(),
            loaded: &self.loads,
        };
        let json = serde_json::to_vec(&description).ok()?;

        let mut buf = allocator.allocate(json.len() + 1)?;
        buf.as_mut_slice()[..json.len()].copy_from_slice(&json);
        Some(buf)
    }

    fn attach_log(&mut self, policy: LogPolicy) -> Result<(), EngineError> {
        if !policy.is_initialized() {
            return Err(EngineError::Log(format!("policy '{}' is destroyed", policy.tag())));
        }
        self.logger.attach(policy);
        self.log(Level::Info, "debug logs enabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StdAllocator;

    #[test]
    fn add_keeps_integers_integral() {
        let ints = [Value::S32(2), Value::S64(3)];
        assert_eq!(builtin_add(&ints), Ok(Some(Value::S64(5))));

        let mixed = [Value::S32(2), Value::F64(0.5)];
        assert_eq!(builtin_add(&mixed), Ok(Some(Value::F64(2.5))));

        assert!(builtin_add(&[Value::Null]).is_err());
    }

    #[test]
    fn description_is_nul_terminated_json() {
        let mut engine = MemoryEngine::with_builtins();
        let allocator = StdAllocator::new(engine.ledger());

        let buf = engine.self_describe(&allocator).expect("describe");
        let bytes = buf.as_slice();
        assert_eq!(bytes.last(), Some(&0));

        let json: serde_json::Value =
            serde_json::from_slice(&bytes[..bytes.len() - 1]).expect("json");
        assert_eq!(json["functions"], serde_json::json!(["add", "concat", "echo"]));
    }
}
