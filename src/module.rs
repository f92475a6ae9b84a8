//! Exports table and one-time initialization
//!
//! A [`Module`] is created once per process by the host's module loader
//! ([`Module::load`]). It starts the engine, then exposes a fixed table of
//! entry points. The table is built during initialization and never changes
//! afterwards; there is no teardown or re-initialization.
//!
//! Entry points never return errors to the host directly: failures are raised
//! through [`HostRuntime::throw_error`] after every resource has been
//! released, and panics are contained at this boundary.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use callbridge_log::{PolicyRegistry, StdioCtor};
use tracing::{debug, warn};

use crate::bridge::{self, BridgeError};
use crate::config::BridgeConfig;
use crate::engine::DispatchEngine;
use crate::host::HostRuntime;

pub const INVOKE: &str = "invoke";
pub const BULK_LOAD: &str = "bulk_load";
pub const INSPECT: &str = "inspect";
pub const ENABLE_LOGGING: &str = "enable_logging";

/// State shared by every entry point.
pub struct Context<E> {
    pub engine: E,
    pub config: BridgeConfig,
    pub registry: PolicyRegistry,
    /// Stream `enable_logging` binds the stdio policy to.
    pub log_stream: StdioCtor,
}

pub type EntryPoint<H, E> = fn(
    &mut Context<E>,
    &mut H,
    &[<H as HostRuntime>::Handle],
) -> Result<Option<<H as HostRuntime>::Handle>, BridgeError>;

pub struct Export<H: HostRuntime, E> {
    pub name: &'static str,
    pub entry: EntryPoint<H, E>,
}

impl<H: HostRuntime, E> Clone for Export<H, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            entry: self.entry,
        }
    }
}

impl<H: HostRuntime, E> fmt::Debug for Export<H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export").field("name", &self.name).finish()
    }
}

/// The (name, entry point) table registered with the host.
pub fn exports<H: HostRuntime, E: DispatchEngine>() -> [Export<H, E>; 4] {
    [
        Export {
            name: INVOKE,
            entry: invoke_entry::<H, E>,
        },
        Export {
            name: BULK_LOAD,
            entry: bulk_load_entry::<H, E>,
        },
        Export {
            name: INSPECT,
            entry: inspect_entry::<H, E>,
        },
        Export {
            name: ENABLE_LOGGING,
            entry: enable_logging_entry::<H, E>,
        },
    ]
}

fn invoke_entry<H: HostRuntime, E: DispatchEngine>(
    ctx: &mut Context<E>,
    host: &mut H,
    args: &[H::Handle],
) -> Result<Option<H::Handle>, BridgeError> {
    bridge::invoke(host, &mut ctx.engine, &ctx.config.limits, args)
}

fn bulk_load_entry<H: HostRuntime, E: DispatchEngine>(
    ctx: &mut Context<E>,
    host: &mut H,
    args: &[H::Handle],
) -> Result<Option<H::Handle>, BridgeError> {
    let [tag, paths, ..] = args else {
        return Err(BridgeError::Arity);
    };
    bridge::bulk_load(host, &mut ctx.engine, &ctx.config.limits, *tag, *paths)?;
    Ok(None)
}

fn inspect_entry<H: HostRuntime, E: DispatchEngine>(
    ctx: &mut Context<E>,
    host: &mut H,
    _args: &[H::Handle],
) -> Result<Option<H::Handle>, BridgeError> {
    bridge::inspect(host, &mut ctx.engine).map(Some)
}

fn enable_logging_entry<H: HostRuntime, E: DispatchEngine>(
    ctx: &mut Context<E>,
    _host: &mut H,
    _args: &[H::Handle],
) -> Result<Option<H::Handle>, BridgeError> {
    bridge::enable_logging(&mut ctx.engine, &ctx.registry, ctx.log_stream.clone())?;
    Ok(None)
}

/// Set by the first successful [`Module::load`] in this process.
static LOADED: AtomicBool = AtomicBool::new(false);

/// An initialized bridge module.
pub struct Module<H: HostRuntime, E: DispatchEngine> {
    context: Context<E>,
    exports: Vec<Export<H, E>>,
}

impl<H: HostRuntime, E: DispatchEngine> Module<H, E> {
    /// Start the engine and build the exports table.
    ///
    /// If the engine fails to start, no module (and no entry point) exists.
    /// Unlike [`Module::load`] this does not claim the process-wide slot, so
    /// embedders can run independent engines side by side.
    pub fn initialize(mut engine: E, config: BridgeConfig) -> Result<Self, BridgeError> {
        engine.initialize().map_err(|err| {
            warn!(error = %err, "engine failed to initialize");
            BridgeError::CallFailure(format!("failed to initialize: {}", err))
        })?;

        let exports = exports::<H, E>().to_vec();
        debug!(exports = exports.len(), "module initialized");
        Ok(Self {
            context: Context {
                engine,
                config,
                registry: PolicyRegistry::with_defaults(),
                log_stream: StdioCtor::stdout(),
            },
            exports,
        })
    }

    /// Host-facing variant of [`Module::initialize`]: failure is raised in
    /// the host.
    ///
    /// At most one load succeeds per process. Later calls raise an error
    /// without touching their engine. A failed start frees the slot again.
    pub fn load(host: &mut H, engine: E, config: BridgeConfig) -> Option<Self> {
        if LOADED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("module already loaded in this process");
            host.throw_error("failed to initialize: module already loaded");
            return None;
        }

        match Self::initialize(engine, config) {
            Ok(module) => Some(module),
            Err(err) => {
                LOADED.store(false, Ordering::Release);
                host.throw_error(&err.to_string());
                None
            }
        }
    }

    /// Bind `enable_logging` to another stream.
    pub fn with_log_stream(mut self, stream: StdioCtor) -> Self {
        self.context.log_stream = stream;
        self
    }

    pub fn export_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.exports.iter().map(|export| export.name)
    }

    pub fn entry(&self, name: &str) -> Option<EntryPoint<H, E>> {
        self.exports
            .iter()
            .find(|export| export.name == name)
            .map(|export| export.entry)
    }

    pub fn engine(&self) -> &E {
        &self.context.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.context.engine
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.context.config
    }

    /// Call an entry point the way the host does.
    ///
    /// Errors and panics are raised through `host.throw_error`, once, and
    /// the call returns no value.
    pub fn call(&mut self, host: &mut H, name: &str, args: &[H::Handle]) -> Option<H::Handle> {
        let Some(entry) = self.entry(name) else {
            host.throw_error(&format!("no such export: {}", name));
            return None;
        };

        let context = &mut self.context;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry(context, &mut *host, args)))
            .unwrap_or_else(|payload| {
                Err(BridgeError::CallFailure(panic_message(payload.as_ref())))
            });

        match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(export = name, error = %err, "entry point failed");
                host.throw_error(&err.to_string());
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("panic in entry point: {}", detail)
}
