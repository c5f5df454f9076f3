//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::io::Write;
use std::path::Path;

/// Generates a configuration template with all options commented out.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// Starshell Configuration File
// ============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.

{
  // ============================================================================
  // Object Cache
  // ============================================================================
  // "objectStore": {
  //   // Milliseconds an unreferenced object stays cached after its last use
  //   "holdTimeMs": 5000,
  //
  //   // Milliseconds between cache sweeps
  //   "sweepIntervalMs": 5000
  // },

  // ============================================================================
  // Tab View Pool
  // ============================================================================
  // "tabCache": {
  //   // Maximum number of resident tab views
  //   "maxSize": 10,
  //
  //   // Minimum idle time before a tab view can be evicted
  //   "evictionIdleMs": 1000,
  //
  //   // Delay before a consumed hot spare is replaced
  //   "spareDelayMs": 500
  // },

  // ============================================================================
  // Windows
  // ============================================================================
  // "window": {
  //   // Initial size of new windows, e.g. "1400x900"
  //   "dimensions": null,
  //
  //   // Transparent or blurred window backgrounds
  //   "transparent": false,
  //   "blur": false,
  //
  //   // Keep the workspace of the last closed window
  //   "saveLastWindow": true,
  //
  //   // Transition timings in milliseconds
  //   "tabInitDelayMs": 100,
  //   "tabReuseDelayMs": 35,
  //   "persistDebounceMs": 400,
  //   "boundsPollMs": 1000,
  //   "closeTabGraceMs": 1000,
  //   "relaunchDelayMs": 1200,
  //   "focusRetryMs": [10, 30]
  // }
}
"#
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist. The template is written to
/// a temporary file in the same directory and then moved into place, so an
/// existing file is never left half-written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(generate_config_template().as_bytes())?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
