use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use callbridge::bridge::{enable_logging, inspect, BridgeError};
use callbridge::engine::{AllocBuf, Allocator, EngineError, NativeString};
use callbridge::module::{BULK_LOAD, ENABLE_LOGGING, INSPECT, INVOKE};
use callbridge::testing::{MemoryEngine, MemoryHost};
use callbridge::value::{Ledger, Resource};
use callbridge::{BridgeConfig, DispatchEngine, GenericValue, Module};
use callbridge_log::{LogPolicy, PolicyRegistry, SharedStream, StdioCtor, STDIO_TAG};

fn module_with_stream(stream: SharedStream) -> (MemoryHost, Module<MemoryHost, MemoryEngine>) {
    let module = Module::initialize(MemoryEngine::with_builtins(), BridgeConfig::default())
        .expect("module")
        .with_log_stream(StdioCtor::new(stream));
    (MemoryHost::new(), module)
}

fn captured() -> (Arc<Mutex<Vec<u8>>>, SharedStream) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let stream: SharedStream = buffer.clone();
    (buffer, stream)
}

fn contents(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    String::from_utf8(buffer.lock().expect("lock").clone()).expect("utf-8")
}

#[test]
fn invoke_through_the_table() {
    let (_, stream) = captured();
    let (mut host, mut module) = module_with_stream(stream);
    let name = host.string("concat");
    let a = host.string("call");
    let b = host.string("bridge");

    let result = module.call(&mut host, INVOKE, &[name, a, b]).expect("result");

    assert_eq!(host.to_json(result), serde_json::json!("callbridge"));
    assert!(host.errors().is_empty());
}

#[test]
fn invoke_failure_is_raised_once() {
    let (_, stream) = captured();
    let (mut host, mut module) = module_with_stream(stream);
    let name = host.string("nope");

    let result = module.call(&mut host, INVOKE, &[name]);

    assert!(result.is_none());
    assert_eq!(host.errors().len(), 1);
    assert!(host.errors()[0].contains("nope"));
    assert_eq!(module.engine().ledger().outstanding(), 0);
}

#[test]
fn unknown_export_is_raised() {
    let (_, stream) = captured();
    let (mut host, mut module) = module_with_stream(stream);

    assert!(module.call(&mut host, "load_from_memory", &[]).is_none());
    assert_eq!(host.take_error().as_deref(), Some("no such export: load_from_memory"));
}

#[test]
fn bulk_load_then_inspect() {
    let (_, stream) = captured();
    let (mut host, mut module) = module_with_stream(stream);
    let tag = host.string("py");
    let script = host.string("script.py");
    let paths = host.array(vec![script]);

    assert!(module.call(&mut host, BULK_LOAD, &[tag, paths]).is_none());
    assert!(host.errors().is_empty());

    let description = module.call(&mut host, INSPECT, &[]).expect("description");
    let text = match host.to_json(description) {
        serde_json::Value::String(text) => text,
        other => panic!("expected string, got {}", other),
    };
    let json: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(json["functions"], serde_json::json!(["add", "concat", "echo"]));
    assert_eq!(json["loaded"][0]["tag"], "py");
    assert_eq!(json["loaded"][0]["paths"], serde_json::json!(["script.py"]));

    let ledger = module.engine().ledger();
    assert_eq!(ledger.acquired(Resource::Allocator), 1);
    assert_eq!(ledger.acquired(Resource::Buffer), 1);
    assert_eq!(ledger.outstanding(), 0);
}

#[test]
fn logging_routes_engine_records_to_the_stream() {
    let (buffer, stream) = captured();
    let (mut host, mut module) = module_with_stream(stream);

    assert!(module.call(&mut host, ENABLE_LOGGING, &[]).is_none());
    assert!(host.errors().is_empty());

    let name = host.string("add");
    let a = host.number(1.0);
    let b = host.number(2.0);
    module.call(&mut host, INVOKE, &[name, a, b]).expect("result");

    let log = contents(&buffer);
    assert!(log.contains("[INFO] engine: debug logs enabled\n"));
    assert!(log.contains("[DEBUG] engine: call add (2 args)\n"));
}

#[test]
fn logging_stream_outlives_the_policy() {
    let (buffer, stream) = captured();
    let mut engine = MemoryEngine::with_builtins();
    let registry = PolicyRegistry::with_defaults();

    enable_logging(&mut engine, &registry, StdioCtor::new(stream)).expect("enable");
    drop(engine);

    // The policy never closes the stream it was given.
    buffer.lock().expect("lock").write_all(b"still open").expect("write");
    assert!(contents(&buffer).ends_with("still open"));
    assert_eq!(Arc::strong_count(&buffer), 1);
}

/// Accepts `room` more bytes, then reports a full stream.
struct FullAfter {
    room: usize,
}

impl Write for FullAfter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.room);
        self.room -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn short_write_surfaces_as_shortfall() {
    let stream: SharedStream = Arc::new(Mutex::new(FullAfter { room: 5 }));
    let registry = PolicyRegistry::with_defaults();
    let mut policy = registry
        .create(STDIO_TAG, Box::new(StdioCtor::new(stream)))
        .expect("policy");

    let err = BridgeError::from(policy.write(b"0123456789").expect_err("expected error"));

    assert!(matches!(
        err,
        BridgeError::WriteShortfall { requested: 10, written: 5 }
    ));
}

#[test]
fn failed_log_writes_do_not_fail_calls() {
    let stream: SharedStream = Arc::new(Mutex::new(FullAfter { room: 0 }));
    let mut host = MemoryHost::new();
    let mut module: Module<MemoryHost, MemoryEngine> =
        Module::initialize(MemoryEngine::with_builtins(), BridgeConfig::default())
            .expect("module")
            .with_log_stream(StdioCtor::new(stream));

    assert!(module.call(&mut host, ENABLE_LOGGING, &[]).is_none());
    let name = host.string("echo");
    let arg = host.bool(true);
    let result = module.call(&mut host, INVOKE, &[name, arg]).expect("result");

    assert_eq!(host.to_json(result), serde_json::json!(true));
    assert!(host.errors().is_empty());
}

#[test]
fn registry_without_stdio_fails_cleanly() {
    let (_, stream) = captured();
    let mut engine = MemoryEngine::with_builtins();

    let err = enable_logging(&mut engine, &PolicyRegistry::new(), StdioCtor::new(stream))
        .expect_err("expected error");

    assert!(matches!(err, BridgeError::CallFailure(msg) if msg.contains("stdio")));
    assert!(engine.logger().policies().is_empty());
}

/// Engine whose self-description is configurable.
struct DescribingEngine {
    ledger: Ledger,
    description: Option<Vec<u8>>,
}

impl DescribingEngine {
    fn new(description: Option<&[u8]>) -> Self {
        Self {
            ledger: Ledger::new(),
            description: description.map(<[u8]>::to_vec),
        }
    }
}

impl DispatchEngine for DescribingEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn call_by_name(
        &mut self,
        name: &str,
        _args: &[GenericValue],
    ) -> Result<Option<GenericValue>, EngineError> {
        Err(EngineError::FunctionNotFound(name.to_string()))
    }

    fn load_from_file(&mut self, _tag: &str, _paths: &[NativeString]) -> i32 {
        0
    }

    fn self_describe(&mut self, allocator: &dyn Allocator) -> Option<AllocBuf> {
        let bytes = self.description.as_ref()?;
        let mut buf = allocator.allocate(bytes.len())?;
        buf.as_mut_slice().copy_from_slice(bytes);
        Some(buf)
    }

    fn attach_log(&mut self, _policy: LogPolicy) -> Result<(), EngineError> {
        Ok(())
    }
}

#[test]
fn missing_description_is_an_error() {
    let mut host = MemoryHost::new();
    let mut engine = DescribingEngine::new(None);

    let err = inspect(&mut host, &mut engine).expect_err("expected error");

    assert!(matches!(err, BridgeError::CallFailure(msg) if msg == "invalid inspect result"));
    assert_eq!(engine.ledger.acquired(Resource::Allocator), 1);
    assert_eq!(engine.ledger.outstanding(), 0);
}

#[test]
fn empty_description_is_an_error() {
    let mut host = MemoryHost::new();
    let mut engine = DescribingEngine::new(Some(&b""[..]));

    let err = inspect(&mut host, &mut engine).expect_err("expected error");

    assert!(matches!(err, BridgeError::CallFailure(_)));
    assert_eq!(engine.ledger.outstanding(), 0);
}

#[test]
fn description_stops_at_terminator() {
    let mut host = MemoryHost::new();
    let mut engine = DescribingEngine::new(Some(&b"{\"ok\":true}\0garbage"[..]));

    let result = inspect(&mut host, &mut engine).expect("inspect");

    assert_eq!(host.to_json(result), serde_json::json!("{\"ok\":true}"));
    assert_eq!(engine.ledger.acquired(Resource::Buffer), 1);
    assert_eq!(engine.ledger.outstanding(), 0);
}

#[test]
fn invalid_utf8_description_releases_buffer() {
    let mut host = MemoryHost::new();
    let mut engine = DescribingEngine::new(Some(&[0xff, 0xfe, 0x00][..]));

    let err = inspect(&mut host, &mut engine).expect_err("expected error");

    assert!(matches!(err, BridgeError::Conversion(_)));
    assert_eq!(engine.ledger.outstanding(), 0);
}
