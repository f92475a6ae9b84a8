//! Callbridge CLI - drive the bridge against the in-memory host and engine
//!
//! Commands:
//!   callbridge invoke <name> [json-args...]  - call a built-in engine function
//!   callbridge load <tag> <paths...>         - forward paths to the engine loader
//!   callbridge inspect                       - print the engine self-description
//!
//! Every command can be preceded by `--preload tag=path` loads and
//! `--logs` to enable the engine's debug log on stderr.

use anyhow::Context as _;
use callbridge::module::{BULK_LOAD, ENABLE_LOGGING, INSPECT, INVOKE};
use callbridge::testing::{Handle, MemoryEngine, MemoryHost};
use callbridge::{BridgeConfig, Module};
use callbridge_log::StdioCtor;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "callbridge")]
#[command(about = "Call engine functions by name through the bridge", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Load `tag=path` before running the command (repeatable)
    #[arg(long, value_name = "TAG=PATH", global = true)]
    preload: Vec<String>,

    /// Enable engine debug logs on stderr
    #[arg(long, global = true)]
    logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call an engine function by name
    Invoke {
        /// Function name
        name: String,

        /// Arguments, each a JSON value
        args: Vec<String>,
    },

    /// Load source files under a language tag
    Load {
        tag: String,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the engine's self-description
    Inspect,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            BridgeConfig::from_json_str(&src)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => BridgeConfig::default(),
    };

    let mut host = MemoryHost::new();
    let mut module: Module<MemoryHost, MemoryEngine> =
        Module::load(&mut host, MemoryEngine::with_builtins(), config)
            .ok_or_else(|| anyhow::anyhow!("{}", pending_error(&mut host)))?
            .with_log_stream(StdioCtor::stderr());

    if cli.logs {
        call(&mut module, &mut host, ENABLE_LOGGING, &[])?;
    }

    for preload in &cli.preload {
        let (tag, path) = preload
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid --preload '{}': expected TAG=PATH", preload))?;
        load_command(&mut module, &mut host, tag, &[path.to_string()])?;
    }

    match cli.command {
        Commands::Invoke { name, args } => invoke_command(&mut module, &mut host, &name, &args),
        Commands::Load { tag, paths } => load_command(&mut module, &mut host, &tag, &paths),
        Commands::Inspect => inspect_command(&mut module, &mut host),
    }
}

fn invoke_command(
    module: &mut Module<MemoryHost, MemoryEngine>,
    host: &mut MemoryHost,
    name: &str,
    args: &[String],
) -> anyhow::Result<()> {
    let mut handles = vec![host.string(name)];
    for arg in args {
        let json: serde_json::Value = serde_json::from_str(arg)
            .with_context(|| format!("Argument is not valid JSON: {}", arg))?;
        handles.push(host.from_json(&json));
    }

    let output = match call(module, host, INVOKE, &handles)? {
        Some(result) => host.to_json(result),
        None => serde_json::Value::Null,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_command(
    module: &mut Module<MemoryHost, MemoryEngine>,
    host: &mut MemoryHost,
    tag: &str,
    paths: &[String],
) -> anyhow::Result<()> {
    let tag = host.string(tag);
    let items = paths.iter().map(|p| host.string(p)).collect();
    let paths = host.array(items);
    call(module, host, BULK_LOAD, &[tag, paths])?;
    Ok(())
}

fn inspect_command(
    module: &mut Module<MemoryHost, MemoryEngine>,
    host: &mut MemoryHost,
) -> anyhow::Result<()> {
    let result = call(module, host, INSPECT, &[])?
        .ok_or_else(|| anyhow::anyhow!("inspect returned no value"))?;
    let text = match host.to_json(result) {
        serde_json::Value::String(s) => s,
        other => anyhow::bail!("inspect returned a non-string value: {}", other),
    };
    let description: serde_json::Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&description)?);
    Ok(())
}

/// Call an export and turn a raised host error into an `anyhow` error.
fn call(
    module: &mut Module<MemoryHost, MemoryEngine>,
    host: &mut MemoryHost,
    name: &str,
    args: &[Handle],
) -> anyhow::Result<Option<Handle>> {
    let result = module.call(host, name, args);
    if let Some(err) = host.take_error() {
        anyhow::bail!("{} failed: {}", name, err);
    }
    Ok(result)
}

fn pending_error(host: &mut MemoryHost) -> String {
    host.take_error()
        .unwrap_or_else(|| "initialization failed".to_string())
}
