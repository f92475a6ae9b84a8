//! `enable_logging()`

use callbridge_log::{PolicyRegistry, StdioCtor, STDIO_TAG};
use tracing::debug;

use super::BridgeError;
use crate::engine::DispatchEngine;

/// Create a stdio log policy over `ctor`'s stream and hand it to the engine.
pub fn enable_logging<E: DispatchEngine>(
    engine: &mut E,
    registry: &PolicyRegistry,
    ctor: StdioCtor,
) -> Result<(), BridgeError> {
    let policy = registry.create(STDIO_TAG, Box::new(ctor))?;
    engine.attach_log(policy).map_err(|err| {
        BridgeError::CallFailure(format!("failed to initialize debug logs: {}", err))
    })?;
    debug!(tag = STDIO_TAG, "debug logs enabled");
    Ok(())
}
