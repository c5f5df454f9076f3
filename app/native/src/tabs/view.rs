//! Tab views: one heavyweight platform surface bound to at most one tab.
//!
//! A [`TabView`] wraps the host's [`PlatformView`] and keeps the bookkeeping
//! the pool and the windows need. The platform side reports renderer
//! progress through [`ViewSignals`].

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::constants::defaults::OFF_SCREEN_COORD;

/// Rectangle in window content coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self { Self { x, y, width, height } }

    /// Same size, placed at the origin.
    #[must_use]
    pub const fn at_origin(self) -> Self { Self::new(0, 0, self.width, self.height) }

    #[must_use]
    pub const fn is_at_origin(&self) -> bool { self.x == 0 && self.y == 0 }
}

/// Options the renderer needs to attach to a tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOpts {
    pub tab_id: String,
    pub client_id: String,
    pub window_id: String,
    pub activate: bool,
}

/// Messages sent from the shell to a tab's renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ViewMessage {
    /// Attach to a tab.
    #[serde(rename = "star-init")]
    Init(InitOpts),
    FullscreenChange(bool),
}

/// The host's view object.
pub trait PlatformView: Send + Sync {
    /// Host identifier, unique among live views.
    fn id(&self) -> u64;

    fn bounds(&self) -> Bounds;

    fn set_bounds(&self, bounds: Bounds);

    fn send(&self, message: ViewMessage);

    fn focus(&self);

    fn is_focused(&self) -> bool;

    /// Releases the renderer. Called at most once.
    fn close(&self);
}

/// Appearance of newly created views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStyle {
    pub background_color: String,
}

impl Default for ViewStyle {
    fn default() -> Self {
        Self { background_color: crate::constants::defaults::OPAQUE_BACKGROUND.to_string() }
    }
}

/// Creates platform views and wires their host-side handlers.
pub trait ViewFactory: Send + Sync {
    /// Creates a view and starts loading its renderer.
    ///
    /// The view reports progress through `signals`.
    fn create_view(&self, style: &ViewStyle, signals: ViewSignals) -> Arc<dyn PlatformView>;

    /// Installs navigation and input handlers once the view is bound to a tab.
    fn register_handlers(&self, _view: &Arc<TabView>) {}
}

/// Write side of a view's readiness flags.
#[derive(Debug, Clone)]
pub struct ViewSignals {
    initialized: Arc<watch::Sender<bool>>,
    ready: Arc<watch::Sender<bool>>,
}

impl ViewSignals {
    /// The renderer asked for its init options.
    pub fn mark_initialized(&self) { self.initialized.send_replace(true); }

    /// The renderer finished attaching to its tab.
    pub fn mark_ready(&self) { self.ready.send_replace(true); }
}

struct TabViewState {
    window_id: Option<String>,
    tab_id: Option<String>,
    active: bool,
    last_used: Instant,
    saved_init_opts: Option<InitOpts>,
    destroyed: bool,
}

/// A platform view plus its pool and window bookkeeping.
pub struct TabView {
    handle: Arc<dyn PlatformView>,
    created_at: Instant,
    initialized: watch::Receiver<bool>,
    ready: watch::Receiver<bool>,
    state: Mutex<TabViewState>,
}

impl TabView {
    /// Creates an unbound view through `factory`.
    pub fn create(factory: &dyn ViewFactory, style: &ViewStyle) -> Arc<Self> {
        let (init_tx, initialized) = watch::channel(false);
        let (ready_tx, ready) = watch::channel(false);
        let signals = ViewSignals { initialized: Arc::new(init_tx), ready: Arc::new(ready_tx) };
        let handle = factory.create_view(style, signals);
        let now = Instant::now();

        tracing::debug!(view_id = handle.id(), "tabs: created tab view");
        Arc::new(Self {
            handle,
            created_at: now,
            initialized,
            ready,
            state: Mutex::new(TabViewState {
                window_id: None,
                tab_id: None,
                active: false,
                last_used: now,
                saved_init_opts: None,
                destroyed: false,
            }),
        })
    }

    #[must_use]
    pub fn view_id(&self) -> u64 { self.handle.id() }

    #[must_use]
    pub fn handle(&self) -> &Arc<dyn PlatformView> { &self.handle }

    #[must_use]
    pub const fn created_at(&self) -> Instant { self.created_at }

    #[must_use]
    pub fn window_id(&self) -> Option<String> { self.state.lock().window_id.clone() }

    #[must_use]
    pub fn tab_id(&self) -> Option<String> { self.state.lock().tab_id.clone() }

    #[must_use]
    pub fn last_used(&self) -> Instant { self.state.lock().last_used }

    pub(crate) fn bind(&self, window_id: &str, tab_id: &str) {
        let mut state = self.state.lock();
        state.window_id = Some(window_id.to_string());
        state.tab_id = Some(tab_id.to_string());
        state.last_used = Instant::now();
    }

    pub(crate) fn set_window_id(&self, window_id: &str) {
        self.state.lock().window_id = Some(window_id.to_string());
    }

    pub fn touch(&self) { self.state.lock().last_used = Instant::now(); }

    #[must_use]
    pub fn is_active(&self) -> bool { self.state.lock().active }

    pub fn set_active(&self, active: bool) { self.state.lock().active = active; }

    // ========================================================================
    // Readiness
    // ========================================================================

    #[must_use]
    pub fn is_initialized(&self) -> bool { *self.initialized.borrow() }

    #[must_use]
    pub fn is_ready(&self) -> bool { *self.ready.borrow() }

    /// Waits until the renderer asks for its init options.
    ///
    /// Returns `false` if the platform view went away first.
    pub async fn wait_initialized(&self) -> bool {
        let mut rx = self.initialized.clone();
        rx.wait_for(|initialized| *initialized).await.is_ok()
    }

    /// Waits until the renderer has attached to its tab.
    ///
    /// Returns `false` if the platform view went away first.
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.ready.clone();
        rx.wait_for(|ready| *ready).await.is_ok()
    }

    // ========================================================================
    // Positioning
    // ========================================================================

    /// Fills the window content area. No-op when already there.
    pub fn position_on_screen(&self, window: Bounds) {
        let target = window.at_origin();
        if self.handle.bounds() != target {
            self.handle.set_bounds(target);
        }
    }

    /// Parks the view outside the visible area at full window size.
    pub fn position_off_screen(&self, window: Bounds) {
        self.handle.set_bounds(Bounds::new(
            OFF_SCREEN_COORD,
            OFF_SCREEN_COORD,
            window.width,
            window.height,
        ));
    }

    #[must_use]
    pub fn is_on_screen(&self) -> bool { self.handle.bounds().is_at_origin() }

    // ========================================================================
    // Renderer messages
    // ========================================================================

    pub fn send(&self, message: ViewMessage) { self.handle.send(message); }

    /// Remembers the options to re-send when the view is shown again.
    pub fn save_init_opts(&self, opts: InitOpts) { self.state.lock().saved_init_opts = Some(opts); }

    #[must_use]
    pub fn saved_init_opts(&self) -> Option<InitOpts> { self.state.lock().saved_init_opts.clone() }

    /// Re-sends the saved init options, if any.
    pub fn resend_init(&self) -> bool {
        let Some(opts) = self.saved_init_opts() else {
            return false;
        };
        self.handle.send(ViewMessage::Init(opts));
        true
    }

    pub fn focus(&self) { self.handle.focus(); }

    #[must_use]
    pub fn is_focused(&self) -> bool { self.handle.is_focused() }

    // ========================================================================
    // Teardown
    // ========================================================================

    #[must_use]
    pub fn is_destroyed(&self) -> bool { self.state.lock().destroyed }

    /// Closes the platform view once. Pool bookkeeping is the caller's job.
    pub(crate) fn close(&self) {
        let first = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.destroyed, true)
        };
        if first {
            tracing::debug!(view_id = self.view_id(), tab_id = ?self.tab_id(), "tabs: destroying tab view");
            self.handle.close();
        }
    }

    /// Records that the platform view was destroyed by the host.
    pub(crate) fn mark_destroyed(&self) { self.state.lock().destroyed = true; }
}

impl std::fmt::Debug for TabView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TabView")
            .field("view_id", &self.handle.id())
            .field("window_id", &state.window_id)
            .field("tab_id", &state.tab_id)
            .field("active", &state.active)
            .field("destroyed", &state.destroyed)
            .finish_non_exhaustive()
    }
}
