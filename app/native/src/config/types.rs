//! Configuration types for Starshell.
//!
//! Every section defaults to the built-in timings, so an empty file or a file
//! that only sets a handful of keys is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{APP_NAME, defaults};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StarConfig {
    /// Object cache settings.
    pub object_store: ObjectStoreConfig,

    /// Tab view pool settings.
    pub tab_cache: TabCacheConfig,

    /// Window behaviour and transition timings.
    pub window: WindowConfig,
}

/// Object cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectStoreConfig {
    /// Milliseconds an unreferenced entry is kept after its last access or update.
    pub hold_time_ms: u64,

    /// Milliseconds between cache sweeps.
    pub sweep_interval_ms: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            hold_time_ms: defaults::OBJECT_HOLD_TIME_MS,
            sweep_interval_ms: defaults::OBJECT_SWEEP_INTERVAL_MS,
        }
    }
}

impl ObjectStoreConfig {
    /// Returns the idle hold window.
    #[must_use]
    pub const fn hold_time(&self) -> Duration { Duration::from_millis(self.hold_time_ms) }

    /// Returns the sweep interval, never shorter than one millisecond.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Tab view pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TabCacheConfig {
    /// Maximum number of resident tab views before eviction kicks in.
    pub max_size: usize,

    /// Milliseconds a tab view must be idle before it can be evicted.
    pub eviction_idle_ms: u64,

    /// Milliseconds to wait before replacing a consumed hot spare.
    pub spare_delay_ms: u64,
}

impl Default for TabCacheConfig {
    fn default() -> Self {
        Self {
            max_size: defaults::TAB_CACHE_MAX_SIZE,
            eviction_idle_ms: defaults::TAB_EVICTION_IDLE_MS,
            spare_delay_ms: defaults::TAB_SPARE_DELAY_MS,
        }
    }
}

impl TabCacheConfig {
    #[must_use]
    pub const fn eviction_idle(&self) -> Duration { Duration::from_millis(self.eviction_idle_ms) }

    #[must_use]
    pub const fn spare_delay(&self) -> Duration { Duration::from_millis(self.spare_delay_ms) }
}

/// Window configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowConfig {
    /// Initial size for new windows as `"WIDTHxHEIGHT"`, e.g. `"1400x900"`.
    pub dimensions: Option<String>,

    /// Render windows with a transparent background.
    pub transparent: bool,

    /// Render windows with a blurred background.
    pub blur: bool,

    /// Keep the last window's workspace when it is closed.
    pub save_last_window: bool,

    /// Settle delay in milliseconds while a new tab view initializes.
    pub tab_init_delay_ms: u64,

    /// Settle delay in milliseconds when a cached tab view is shown again.
    pub tab_reuse_delay_ms: u64,

    /// Debounce in milliseconds before window bounds are persisted.
    pub persist_debounce_ms: u64,

    /// Interval in milliseconds of the idle bounds poller.
    pub bounds_poll_ms: u64,

    /// Milliseconds before a closed tab's view is detached.
    pub close_tab_grace_ms: u64,

    /// Pause in milliseconds between closing and reopening windows on relaunch.
    pub relaunch_delay_ms: u64,

    /// Focus retry delays in milliseconds after a tab becomes visible.
    pub focus_retry_ms: Vec<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            dimensions: None,
            transparent: false,
            blur: false,
            save_last_window: true,
            tab_init_delay_ms: defaults::TAB_INIT_DELAY_MS,
            tab_reuse_delay_ms: defaults::TAB_REUSE_DELAY_MS,
            persist_debounce_ms: defaults::PERSIST_DEBOUNCE_MS,
            bounds_poll_ms: defaults::BOUNDS_POLL_MS,
            close_tab_grace_ms: defaults::CLOSE_TAB_GRACE_MS,
            relaunch_delay_ms: defaults::RELAUNCH_DELAY_MS,
            focus_retry_ms: defaults::FOCUS_RETRY_MS.to_vec(),
        }
    }
}

impl WindowConfig {
    #[must_use]
    pub const fn tab_init_delay(&self) -> Duration { Duration::from_millis(self.tab_init_delay_ms) }

    #[must_use]
    pub const fn tab_reuse_delay(&self) -> Duration {
        Duration::from_millis(self.tab_reuse_delay_ms)
    }

    #[must_use]
    pub const fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    /// Poll interval, never shorter than one millisecond.
    #[must_use]
    pub fn bounds_poll(&self) -> Duration { Duration::from_millis(self.bounds_poll_ms.max(1)) }

    #[must_use]
    pub const fn close_tab_grace(&self) -> Duration {
        Duration::from_millis(self.close_tab_grace_ms)
    }

    #[must_use]
    pub const fn relaunch_delay(&self) -> Duration { Duration::from_millis(self.relaunch_delay_ms) }

    #[must_use]
    pub fn focus_retries(&self) -> Vec<Duration> {
        self.focus_retry_ms.iter().copied().map(Duration::from_millis).collect()
    }

    /// Background colour for tab views hosted in windows with these settings.
    #[must_use]
    pub const fn background_color(&self) -> &'static str {
        if self.transparent || self.blur {
            defaults::TRANSPARENT_BACKGROUND
        } else {
            defaults::OPAQUE_BACKGROUND
        }
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at ~/.config/{APP_NAME}/config.jsonc \
                or ~/.config/{APP_NAME}/config.json"
            ),
            Self::IoError(err) => write!(f, "Failed to read configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
            Self::NotFound => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/starshell/` when the variable is set
/// 2. `~/.config/starshell/`
/// 3. the platform configuration directory reported by `dirs::config_dir()`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let mut push_dir = |dir: PathBuf| {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(PathBuf::from(xdg_config).join(APP_NAME));
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(home.join(".config").join(APP_NAME));
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(config_dir.join(APP_NAME));
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations.
/// Returns `ConfigError::IoError` if a configuration file exists but could not be read.
/// Returns `ConfigError::ParseError` if the configuration file contains invalid JSON.
pub fn load_config() -> Result<(StarConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads the configuration from a specific file.
///
/// The file may contain `//` and `/* */` comments.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, otherwise the
/// read or parse error.
pub fn load_config_from_path(path: &Path) -> Result<(StarConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: StarConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
