use callbridge::module::INVOKE;
use callbridge::testing::{MemoryEngine, MemoryHost};
use callbridge::{BridgeConfig, Module};

type TestModule = Module<MemoryHost, MemoryEngine>;

// One test: the load slot is process-wide, so the sequence must not
// interleave with other tests in this binary.
#[test]
fn only_one_module_loads_per_process() {
    let mut host = MemoryHost::new();

    let mut failing = MemoryEngine::with_builtins();
    failing.fail_initialization();
    let failed: Option<TestModule> = Module::load(&mut host, failing, BridgeConfig::default());
    assert!(failed.is_none());
    assert!(host
        .take_error()
        .expect("pending error")
        .starts_with("failed to initialize: engine initialization failed"));

    let first: Option<TestModule> =
        Module::load(&mut host, MemoryEngine::with_builtins(), BridgeConfig::default());
    let mut first = first.expect("first load");
    assert!(first.engine().is_initialized());
    assert!(host.errors().is_empty());

    let second: Option<TestModule> =
        Module::load(&mut host, MemoryEngine::with_builtins(), BridgeConfig::default());
    assert!(second.is_none());
    assert_eq!(
        host.take_error().as_deref(),
        Some("failed to initialize: module already loaded")
    );

    // The loaded module keeps working.
    let name = host.string("echo");
    let arg = host.bool(true);
    let result = first.call(&mut host, INVOKE, &[name, arg]).expect("result");
    assert_eq!(host.to_json(result), serde_json::json!(true));

    // Embedders can still build independent modules.
    let embedded: TestModule =
        Module::initialize(MemoryEngine::with_builtins(), BridgeConfig::default()).expect("init");
    assert!(embedded.engine().is_initialized());
}
