//! Call dispatch: `invoke(name, ...args)`

use tracing::{debug, warn};

use super::{try_buffer, BridgeError};
use crate::config::Limits;
use crate::engine::DispatchEngine;
use crate::host::{
    generic_to_host_with_limits, host_to_generic_with_limits, CallbackInfo, HostError, HostRuntime,
};
use crate::value::GenericValue;

/// Call the engine function named by argument 0 with the remaining
/// arguments.
///
/// Every generic value created here is destroyed before returning, on
/// success and on every failure. Each argument and the result are marshaled
/// within `limits.max_nodes`.
pub fn invoke<H, E, I>(
    host: &mut H,
    engine: &mut E,
    limits: &Limits,
    info: &I,
) -> Result<Option<H::Handle>, BridgeError>
where
    H: HostRuntime,
    E: DispatchEngine,
    I: CallbackInfo<H::Handle> + ?Sized,
{
    let argc = info.argc();
    if argc == 0 {
        return Err(BridgeError::Arity);
    }

    let mut argv: Vec<H::Handle> = try_buffer(argc, "argument handles")?;
    for index in 0..argc {
        let handle = info.arg(index).ok_or_else(|| {
            BridgeError::Host(HostError(format!("missing argument {}", index)))
        })?;
        argv.push(handle);
    }

    let name = decode_name(host, argv[0])?;

    let ledger = engine.ledger().clone();
    let mut args: Vec<GenericValue> = try_buffer(argc - 1, "argument values")?;
    for (index, &handle) in argv[1..].iter().enumerate() {
        let value = host_to_generic_with_limits(host, &ledger, handle, limits).map_err(|err| {
            warn!(function = %name, index, error = %err, "argument conversion failed");
            err
        })?;
        args.push(value);
    }

    debug!(function = %name, args = args.len(), "dispatching call");
    let outcome = engine.call_by_name(&name, &args);

    for value in args {
        value.destroy();
    }

    let ret = outcome.map_err(|err| {
        warn!(function = %name, error = %err, "call failed");
        BridgeError::CallFailure(err.to_string())
    })?;

    match ret {
        Some(ret) => {
            let converted = generic_to_host_with_limits(host, &ret, limits);
            ret.destroy();
            Ok(Some(converted?))
        }
        None => Ok(None),
    }
}

/// Decode a function name. Empty names are rejected.
fn decode_name<H: HostRuntime>(host: &H, handle: H::Handle) -> Result<String, BridgeError> {
    let len = host
        .utf8_len(handle)
        .map_err(|err| BridgeError::NameDecode(err.to_string()))?;
    if len == 0 {
        return Err(BridgeError::NameDecode("empty function name".into()));
    }

    let mut buf: Vec<u8> = try_buffer(len + 1, "function name")?;
    buf.resize(len + 1, 0);
    let written = host
        .read_utf8(handle, &mut buf)
        .map_err(|err| BridgeError::NameDecode(err.to_string()))?;
    buf.truncate(written);

    String::from_utf8(buf).map_err(|err| BridgeError::NameDecode(err.to_string()))
}
