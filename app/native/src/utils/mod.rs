//! Task helpers shared by the cache, the tab pool and the windows.

mod debounce;

use std::any::Any;
use std::future::Future;

pub use debounce::Debouncer;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Spawns `task` on the current runtime and forgets it.
///
/// Outside a runtime the task is dropped with a debug log.
pub fn spawn_detached<F>(name: &'static str, task: F)
where F: Future<Output = ()> + Send + 'static {
    drop(spawn_in_runtime(name, task));
}

/// Spawns `task` on the current runtime, if there is one.
pub fn spawn_in_runtime<F>(name: &'static str, task: F) -> Option<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Some(handle.spawn(task)),
        Err(_) => {
            tracing::debug!(task = name, "no async runtime, task not started");
            None
        }
    }
}

/// Extracts the message of a caught panic.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
