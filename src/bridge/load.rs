//! Bulk source loading: `bulk_load(tag, paths)`

use tracing::{debug, warn};

use super::{try_buffer, BridgeError};
use crate::config::Limits;
use crate::engine::{DispatchEngine, NativeString};
use crate::host::{ConversionError, HostRuntime};

/// Load every path in the host array `paths` under the language `tag`.
///
/// Each element is coerced to a string by the host and copied into a
/// [`NativeString`]; the copies are released after the engine returns,
/// whatever its status. An empty array loads nothing.
pub fn bulk_load<H, E>(
    host: &mut H,
    engine: &mut E,
    limits: &Limits,
    tag: H::Handle,
    paths: H::Handle,
) -> Result<(), BridgeError>
where
    H: HostRuntime,
    E: DispatchEngine,
{
    let tag = decode_tag(host, limits, tag)?;

    let len = host.array_len(paths)? as usize;
    if len > limits.max_load_paths {
        return Err(BridgeError::CapacityExceeded {
            what: "path list",
            len,
            capacity: limits.max_load_paths,
        });
    }
    if len == 0 {
        debug!(tag = %tag, "nothing to load");
        return Ok(());
    }

    let ledger = engine.ledger().clone();
    let mut natives: Vec<NativeString> = try_buffer(len, "path list")?;
    for index in 0..len {
        let element = host.array_get(paths, index as u32)?;
        let bytes = copy_path(host, limits, element, index)?;
        let native = NativeString::new(&ledger, bytes)
            .map_err(|err| ConversionError::InteriorNul(err.nul_position()))?;
        natives.push(native);
    }

    debug!(tag = %tag, count = natives.len(), "loading sources");
    let status = engine.load_from_file(&tag, &natives);
    drop(natives);

    if status != 0 {
        warn!(tag = %tag, status, "load from file failed");
        return Err(BridgeError::CallFailure(format!(
            "could not load from file (status {})",
            status
        )));
    }
    Ok(())
}

/// Decode the language tag into a buffer bounded by `max_tag_len`.
fn decode_tag<H: HostRuntime>(
    host: &H,
    limits: &Limits,
    handle: H::Handle,
) -> Result<String, BridgeError> {
    let len = host
        .utf8_len(handle)
        .map_err(|err| BridgeError::NameDecode(err.to_string()))?;
    if len == 0 {
        return Err(BridgeError::NameDecode("empty language tag".into()));
    }
    if len > limits.max_tag_len {
        return Err(BridgeError::CapacityExceeded {
            what: "language tag",
            len,
            capacity: limits.max_tag_len,
        });
    }

    let mut buf = vec![0u8; limits.max_tag_len + 1];
    let written = host
        .read_utf8(handle, &mut buf)
        .map_err(|err| BridgeError::NameDecode(err.to_string()))?;
    buf.truncate(written);

    String::from_utf8(buf).map_err(|err| BridgeError::NameDecode(err.to_string()))
}

/// Coerce one element to a string and copy its bytes out of the host.
fn copy_path<H: HostRuntime>(
    host: &mut H,
    limits: &Limits,
    element: H::Handle,
    index: usize,
) -> Result<Vec<u8>, BridgeError> {
    let coerced = host.coerce_to_string(element)?;
    let len = host.utf8_len(coerced)?;
    if len == 0 {
        return Err(BridgeError::NameDecode(format!("empty path at index {}", index)));
    }
    if len > limits.max_path_len {
        return Err(BridgeError::CapacityExceeded {
            what: "path",
            len,
            capacity: limits.max_path_len,
        });
    }

    let mut buf: Vec<u8> = try_buffer(len + 1, "path")?;
    buf.resize(len + 1, 0);
    let written = host.read_utf8(coerced, &mut buf)?;
    buf.truncate(written);
    Ok(buf)
}
