//! Application-wide constants.

/// Application name, used for configuration directories and log filters.
pub const APP_NAME: &str = "starshell";

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV_VAR: &str = "STARSHELL_LOG";

/// Event type carrying pushed object updates.
pub const EVENT_OBJECT_UPDATE: &str = "starobj:update";

/// Default timings and sizes. Most of them can be changed in the configuration file.
pub mod defaults {
    /// How long an unreferenced cache entry survives after its last access or update.
    pub const OBJECT_HOLD_TIME_MS: u64 = 5000;

    /// Interval of the periodic cache sweep.
    pub const OBJECT_SWEEP_INTERVAL_MS: u64 = 5000;

    /// Maximum number of resident tab views.
    pub const TAB_CACHE_MAX_SIZE: usize = 10;

    /// Minimum idle time before a tab view may be evicted.
    pub const TAB_EVICTION_IDLE_MS: u64 = 1000;

    /// Delay before a consumed hot spare is replaced.
    pub const TAB_SPARE_DELAY_MS: u64 = 500;

    /// Settle delay while a freshly created tab view is initialized.
    pub const TAB_INIT_DELAY_MS: u64 = 100;

    /// Settle delay when an already initialized tab view is shown again.
    pub const TAB_REUSE_DELAY_MS: u64 = 35;

    /// Debounce for persisting window bounds to the backend.
    pub const PERSIST_DEBOUNCE_MS: u64 = 400;

    /// Interval of the window bounds poller.
    pub const BOUNDS_POLL_MS: u64 = 1000;

    /// Grace period before a closed tab view is detached from its window.
    pub const CLOSE_TAB_GRACE_MS: u64 = 1000;

    /// Pause between closing and recreating windows during a relaunch.
    pub const RELAUNCH_DELAY_MS: u64 = 1200;

    /// Focus retries after a tab becomes visible.
    pub const FOCUS_RETRY_MS: [u64; 2] = [10, 30];

    /// Coordinate used to park tab views off screen.
    pub const OFF_SCREEN_COORD: i32 = -15000;

    /// Background colour of tab views in opaque windows.
    pub const OPAQUE_BACKGROUND: &str = "#222222";

    /// Background colour of tab views in transparent or blurred windows.
    pub const TRANSPARENT_BACKGROUND: &str = "#00000000";
}
