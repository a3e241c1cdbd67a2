use lapse_core::prelude::ShutdownHandle;
use tokio::signal;

use crate::types::LapseResult;

/// Trigger the returned handle when the user presses Ctrl-C.
///
/// The in-flight command shares the terminal's foreground process group, so it receives the same
/// interrupt and is left to terminate on its own. The orchestrator then stops at its next check.
pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> LapseResult<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received interrupt, stopping the benchmark...");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    Ok(handle)
}
