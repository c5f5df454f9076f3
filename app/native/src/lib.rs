//! Starshell - the object sync and tab lifecycle core of Star Terminal.
//!
//! The crate keeps a versioned cache of backend objects, fans pushed events
//! out to subscribers, recycles heavyweight tab views across windows and
//! serializes structural window transitions. The GUI runtime and the backend
//! transport are reached through traits, so the core runs unchanged under a
//! desktop host or a test harness.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod objects;
pub mod schema;
pub mod services;
pub mod shell;
pub mod tabs;
pub mod utils;
pub mod windows;

#[cfg(test)]
pub(crate) mod testing;

pub use shell::{ShellOptions, StarShell};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// The filter is read from `STARSHELL_LOG` and defaults to `info`. Calling
/// this more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(constants::LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
