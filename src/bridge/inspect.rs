//! Introspection: `inspect()`

use tracing::debug;

use super::BridgeError;
use crate::engine::{Allocator, DispatchEngine, StdAllocator};
use crate::host::{ConversionError, HostRuntime, HostValue};

/// Return the engine's self-description as a host string.
///
/// The engine's buffer and the allocator are released whether or not the
/// host string could be created.
pub fn inspect<H, E>(host: &mut H, engine: &mut E) -> Result<H::Handle, BridgeError>
where
    H: HostRuntime,
    E: DispatchEngine,
{
    let allocator = StdAllocator::new(engine.ledger());

    let buf = match engine.self_describe(&allocator) {
        Some(buf) if !buf.is_empty() => buf,
        _ => return Err(BridgeError::CallFailure("invalid inspect result".into())),
    };

    // The engine's length counts the NUL terminator.
    let bytes = buf.as_slice();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let result = std::str::from_utf8(&bytes[..end])
        .map_err(|err| BridgeError::from(ConversionError::InvalidUtf8(err.to_string())))
        .and_then(|text| {
            debug!(len = text.len(), "inspect result");
            host.create(HostValue::String(text.to_string()))
                .map_err(BridgeError::from)
        });

    allocator.free(buf);
    drop(allocator);
    result
}
