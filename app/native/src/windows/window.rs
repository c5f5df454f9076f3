//! One top-level window and the tab views it hosts.
//!
//! Structural changes (switching, creating and closing tabs, switching
//! workspaces) go through the window's [`ActionQueue`] and run one at a time.
//! Each one awaits its backend call and the tab view transition before the
//! next one starts.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::context::ShellContext;
use super::queue::{ActionQueue, WindowAction};
use crate::objects::{ObjectStoreError, Point, WinSize};
use crate::services::BackendError;
use crate::tabs::{Bounds, InitOpts, PlatformView, TabView, ViewHost, ViewMessage};
use crate::utils::{Debouncer, panic_message, spawn_detached, spawn_in_runtime};

/// Errors raised by window and workspace operations.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("window {0} not found")]
    NotFound(String),
    #[error("workspace {0} not found")]
    WorkspaceNotFound(String),
    #[error("tab view for {0} went away before it was ready")]
    ViewClosed(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Objects(#[from] ObjectStoreError),
}

/// The host's top-level window.
pub trait NativeWindow: Send + Sync {
    /// Bounds of the content area, used to size tab views.
    fn content_bounds(&self) -> Bounds;

    /// Outer bounds in screen coordinates.
    fn bounds(&self) -> Bounds;

    fn is_destroyed(&self) -> bool;

    fn is_fullscreen(&self) -> bool;

    fn add_child_view(&self, view: &Arc<dyn PlatformView>);

    fn remove_child_view(&self, view: &Arc<dyn PlatformView>);

    fn show(&self);

    fn focus(&self);

    /// Asks the window to close. The host reports back through the window manager.
    fn close(&self);

    /// Destroys the window without asking.
    fn destroy(&self);
}

struct WindowState {
    workspace_id: String,
    loaded: HashMap<String, Arc<TabView>>,
    active: Option<Arc<TabView>>,
    can_close: bool,
    delete_allowed: bool,
}

/// A window showing one workspace.
pub struct StarWindow {
    window_id: String,
    native: Arc<dyn NativeWindow>,
    ctx: Arc<ShellContext>,
    weak_self: Weak<StarWindow>,
    state: Mutex<WindowState>,
    queue: Mutex<ActionQueue>,
    persist: Debouncer,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl StarWindow {
    /// Wraps `native`, registers the window as a tab view host and starts the bounds poller.
    pub fn new(
        window_id: &str,
        workspace_id: &str,
        native: Arc<dyn NativeWindow>,
        ctx: Arc<ShellContext>,
    ) -> Arc<Self> {
        let persist = Debouncer::new(ctx.config.window.persist_debounce());
        let window = Arc::new_cyclic(|weak_self| Self {
            window_id: window_id.to_string(),
            native,
            ctx,
            weak_self: weak_self.clone(),
            state: Mutex::new(WindowState {
                workspace_id: workspace_id.to_string(),
                loaded: HashMap::new(),
                active: None,
                can_close: false,
                delete_allowed: false,
            }),
            queue: Mutex::new(ActionQueue::default()),
            persist,
            poller: Mutex::new(None),
        });

        let host: Weak<dyn ViewHost> = window.weak_self.clone();
        window.ctx.pool.register_host(window_id, host);
        window.start_bounds_poller();
        tracing::debug!(%window_id, %workspace_id, "window: created");
        window
    }

    #[must_use]
    pub fn window_id(&self) -> &str { &self.window_id }

    #[must_use]
    pub fn native(&self) -> &Arc<dyn NativeWindow> { &self.native }

    #[must_use]
    pub fn workspace_id(&self) -> String { self.state.lock().workspace_id.clone() }

    #[must_use]
    pub fn active_view(&self) -> Option<Arc<TabView>> { self.state.lock().active.clone() }

    #[must_use]
    pub fn active_tab_id(&self) -> Option<String> { self.active_view().and_then(|view| view.tab_id()) }

    #[must_use]
    pub fn has_tab(&self, tab_id: &str) -> bool { self.state.lock().loaded.contains_key(tab_id) }

    /// Tab ids of every loaded view.
    #[must_use]
    pub fn loaded_tab_ids(&self) -> Vec<String> { self.state.lock().loaded.keys().cloned().collect() }

    #[must_use]
    pub fn queue_len(&self) -> usize { self.queue.lock().len() }

    #[must_use]
    pub fn can_close(&self) -> bool { self.state.lock().can_close }

    pub(crate) fn set_can_close(&self, can_close: bool) { self.state.lock().can_close = can_close; }

    #[must_use]
    pub fn delete_allowed(&self) -> bool { self.state.lock().delete_allowed }

    pub(crate) fn set_delete_allowed(&self, allowed: bool) { self.state.lock().delete_allowed = allowed; }

    pub fn show(&self) { self.native.show(); }

    pub fn focus(&self) { self.native.focus(); }

    /// Asks the host to close the window.
    pub fn close(&self) { self.native.close(); }

    /// Destroys the window and lets the backend forget it once closed.
    pub fn destroy(&self) {
        tracing::debug!(window_id = %self.window_id, "window: destroying");
        self.set_delete_allowed(true);
        self.native.destroy();
    }

    // ========================================================================
    // Action queue
    // ========================================================================

    /// Shows `tab_id`, optionally recording it as active in the backend.
    pub async fn set_active_tab(&self, tab_id: &str, set_in_backend: bool) {
        tracing::debug!(window_id = %self.window_id, %tab_id, set_in_backend, "window: set active tab");
        self.queue_action(WindowAction::SwitchTab { tab_id: tab_id.to_string(), set_in_backend }).await;
    }

    pub async fn queue_create_tab(&self, pinned: bool) {
        self.queue_action(WindowAction::CreateTab { pinned }).await;
    }

    pub async fn queue_close_tab(&self, tab_id: &str) {
        self.queue_action(WindowAction::CloseTab { tab_id: tab_id.to_string() }).await;
    }

    pub async fn queue_switch_workspace(&self, workspace_id: &str) {
        self.queue_action(WindowAction::SwitchWorkspace { workspace_id: workspace_id.to_string() })
            .await;
    }

    /// Queues `action` and, if the queue was idle, drains it.
    ///
    /// The drain runs as its own task so dropping the caller's future does
    /// not leave the queue stuck.
    pub async fn queue_action(&self, action: WindowAction) {
        let start = self.queue.lock().push(action);
        if !start {
            return;
        }
        let Some(window) = self.weak_self.upgrade() else {
            return;
        };

        let drain = Arc::clone(&window).process_queue();
        match spawn_in_runtime("window: action queue", drain) {
            Some(handle) => {
                if let Err(err) = handle.await {
                    tracing::error!(window_id = %self.window_id, error = %err, "window: action queue task failed");
                }
            }
            None => window.process_queue().await,
        }
    }

    async fn process_queue(self: Arc<Self>) {
        loop {
            let Some(action) = self.queue.lock().front().cloned() else {
                break;
            };
            if self.native.is_destroyed() {
                self.queue.lock().clear();
                break;
            }

            let name = action.name();
            let outcome = AssertUnwindSafe(self.run_action(action)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(window_id = %self.window_id, action = name, error = %err, "window: action failed");
                }
                Err(payload) => {
                    tracing::error!(
                        window_id = %self.window_id,
                        "window: PANIC while running '{name}': {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
            self.queue.lock().pop_front();
        }
    }

    async fn run_action(&self, action: WindowAction) -> Result<(), WindowError> {
        let Some(tab_id) = self.resolve_action(action).await? else {
            return Ok(());
        };
        let (view, initialized) = self.ctx.pool.get_or_create(&self.window_id, &tab_id);
        self.set_tab_view_into_window(view, initialized).await
    }

    /// Performs the backend side of `action` and returns the tab to show.
    async fn resolve_action(&self, action: WindowAction) -> Result<Option<String>, WindowError> {
        let workspace_id = self.workspace_id();
        let services = &self.ctx.services;

        match action {
            WindowAction::CreateTab { pinned } => {
                let ret = services.workspaces.create_tab(&workspace_id, None, true, pinned).await?;
                Ok(Some(self.ctx.apply(ret)).filter(|id| !id.is_empty()))
            }
            WindowAction::SwitchTab { tab_id, set_in_backend } => {
                if self.active_tab_id().as_deref() == Some(tab_id.as_str()) {
                    return Ok(None);
                }
                if set_in_backend {
                    let ret = services.workspaces.set_active_tab(&workspace_id, &tab_id).await?;
                    self.ctx.apply(ret);
                }
                Ok(Some(tab_id))
            }
            WindowAction::CloseTab { tab_id } => {
                let ret = services.workspaces.close_tab(&workspace_id, &tab_id, true).await?;
                let result = self.ctx.apply(ret);
                self.remove_tab_view_later(&tab_id);
                if result.close_window {
                    tracing::debug!(window_id = %self.window_id, "window: last tab closed, closing window");
                    self.native.close();
                    return Ok(None);
                }
                Ok(result.new_active_tab_id.filter(|id| !id.is_empty()))
            }
            WindowAction::SwitchWorkspace { workspace_id: target } => {
                let ret = services.windows.switch_workspace(&self.window_id, &target).await?;
                let Some(workspace) = self.ctx.apply(ret) else {
                    return Ok(None);
                };
                self.remove_all_child_views();
                self.state.lock().workspace_id = target;
                tracing::debug!(window_id = %self.window_id, workspace_id = %workspace.oid, "window: switched workspace");
                Ok(Some(workspace.activetabid).filter(|id| !id.is_empty()))
            }
        }
    }

    // ========================================================================
    // Tab view transitions
    // ========================================================================

    async fn set_tab_view_into_window(&self, view: Arc<TabView>, initialized: bool) -> Result<(), WindowError> {
        {
            let mut state = self.state.lock();
            if state.active.as_ref().is_some_and(|active| Arc::ptr_eq(active, &view)) {
                return Ok(());
            }
            view.set_active(true);
            if let Some(old) = state.active.replace(Arc::clone(&view)) {
                old.set_active(false);
            }
            if let Some(tab_id) = view.tab_id() {
                state.loaded.insert(tab_id, Arc::clone(&view));
            }
        }

        let window = &self.ctx.config.window;
        if initialized {
            tracing::trace!(window_id = %self.window_id, view_id = view.view_id(), "window: reusing tab view");
            view.resend_init();
            self.reposition_tabs_slowly(window.tab_reuse_delay()).await;
        } else {
            tracing::trace!(window_id = %self.window_id, view_id = view.view_id(), "window: initializing tab view");
            let (init, ()) = tokio::join!(
                self.initialize_tab(&view),
                self.reposition_tabs_slowly(window.tab_init_delay())
            );
            if let Err(err) = init {
                self.discard_failed_view(&view, &err);
                return Err(err);
            }
        }

        view.focus();
        self.schedule_focus_retries(&view);
        Ok(())
    }

    /// Forgets a view that never finished initializing, so the next switch
    /// to its tab starts over. A view whose platform side is gone is destroyed.
    fn discard_failed_view(&self, view: &Arc<TabView>, err: &WindowError) {
        {
            let mut state = self.state.lock();
            if state.active.as_ref().is_some_and(|active| Arc::ptr_eq(active, view)) {
                state.active = None;
                view.set_active(false);
            }
            if let Some(tab_id) = view.tab_id() {
                if state.loaded.get(&tab_id).is_some_and(|loaded| Arc::ptr_eq(loaded, view)) {
                    state.loaded.remove(&tab_id);
                }
            }
        }
        if matches!(err, WindowError::ViewClosed(_)) {
            self.ctx.pool.destroy(view);
        }
    }

    async fn initialize_tab(&self, view: &Arc<TabView>) -> Result<(), WindowError> {
        let tab_id = view.tab_id().unwrap_or_default();
        let client_id = self.ctx.client_id().await?;
        if !view.wait_initialized().await {
            return Err(WindowError::ViewClosed(tab_id));
        }

        self.native.add_child_view(view.handle());
        let opts = InitOpts {
            tab_id: tab_id.clone(),
            client_id,
            window_id: self.window_id.clone(),
            activate: true,
        };
        view.save_init_opts(InitOpts { activate: false, ..opts.clone() });
        view.send(ViewMessage::Init(opts));

        let started = tokio::time::Instant::now();
        if !view.wait_ready().await {
            return Err(WindowError::ViewClosed(tab_id));
        }
        tracing::debug!(%tab_id, elapsed_ms = started.elapsed().as_millis(), "window: tab view ready");
        Ok(())
    }

    /// Moves the active view into place, waits `delay`, then finalizes
    /// positioning unless another view became active meanwhile.
    async fn reposition_tabs_slowly(&self, delay: Duration) {
        let Some(active) = self.active_view() else {
            return;
        };
        let win = self.native.content_bounds();
        if active.is_on_screen() {
            active.handle().set_bounds(win.at_origin());
        } else {
            active.handle().set_bounds(Bounds::new(win.width - 10, win.height - 10, win.width, win.height));
        }

        tokio::time::sleep(delay).await;
        if !self.is_active_view(&active) {
            return;
        }
        self.finalize_positioning();
    }

    /// Puts the active view on screen and parks every other loaded view.
    pub fn finalize_positioning(&self) {
        if self.native.is_destroyed() {
            return;
        }
        let (active, others) = {
            let state = self.state.lock();
            let others: Vec<Arc<TabView>> = state
                .loaded
                .values()
                .filter(|view| !state.active.as_ref().is_some_and(|active| Arc::ptr_eq(active, view)))
                .cloned()
                .collect();
            (state.active.clone(), others)
        };

        let bounds = self.native.content_bounds();
        if let Some(active) = active {
            active.position_on_screen(bounds);
        }
        for view in others {
            view.position_off_screen(bounds);
        }
    }

    fn is_active_view(&self, view: &Arc<TabView>) -> bool {
        self.state.lock().active.as_ref().is_some_and(|active| Arc::ptr_eq(active, view))
    }

    fn schedule_focus_retries(&self, view: &Arc<TabView>) {
        for delay in self.ctx.config.window.focus_retries() {
            let window = self.weak_self.clone();
            let view = Arc::clone(view);
            spawn_detached("window: focus retry", async move {
                tokio::time::sleep(delay).await;
                let Some(window) = window.upgrade() else {
                    return;
                };
                if window.is_active_view(&view) && !view.is_destroyed() && !view.is_focused() {
                    view.focus();
                }
            });
        }
    }

    // ========================================================================
    // Removing views
    // ========================================================================

    fn remove_tab_view_later(&self, tab_id: &str) {
        let window = self.weak_self.clone();
        let tab_id = tab_id.to_string();
        let delay = self.ctx.config.window.close_tab_grace();
        spawn_detached("window: remove closed tab", async move {
            tokio::time::sleep(delay).await;
            if let Some(window) = window.upgrade() {
                window.remove_tab_view(&tab_id, false);
            }
        });
    }

    /// Detaches and destroys every loaded view.
    pub fn remove_all_child_views(&self) {
        let views: Vec<Arc<TabView>> = {
            let mut state = self.state.lock();
            if let Some(active) = state.active.take() {
                active.set_active(false);
            }
            state.loaded.drain().map(|(_, view)| view).collect()
        };

        let attached = !self.native.is_destroyed();
        for view in views {
            if attached {
                self.native.remove_child_view(view.handle());
            }
            self.ctx.pool.destroy(&view);
        }
    }

    // ========================================================================
    // Host events
    // ========================================================================

    fn start_bounds_poller(&self) {
        let window = self.weak_self.clone();
        let interval = self.ctx.config.window.bounds_poll();
        let handle = spawn_in_runtime("window: bounds poller", async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(window) = window.upgrade() else {
                    break;
                };
                if window.native.is_destroyed() {
                    break;
                }
                if window.queue.lock().is_empty() {
                    window.finalize_positioning();
                }
            }
        });
        *self.poller.lock() = handle;
    }

    pub(crate) fn stop_bounds_poller(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }

    /// The window was resized.
    pub fn on_resize(&self) {
        if self.native.is_destroyed() {
            return;
        }
        self.persist_bounds();
        if let Some(active) = self.active_view() {
            active.position_on_screen(self.native.content_bounds());
        }
    }

    /// The window was moved.
    pub fn on_move(&self) {
        if self.native.is_destroyed() {
            return;
        }
        self.persist_bounds();
    }

    pub fn on_fullscreen_change(&self, fullscreen: bool) {
        if self.native.is_destroyed() {
            return;
        }
        if let Some(active) = self.active_view() {
            active.send(ViewMessage::FullscreenChange(fullscreen));
            active.position_on_screen(self.native.content_bounds());
        }
    }

    fn persist_bounds(&self) {
        let window = self.weak_self.clone();
        self.persist.call("window: persist bounds", async move {
            let Some(window) = window.upgrade() else {
                return;
            };
            if window.native.is_destroyed() || window.native.is_fullscreen() {
                return;
            }
            let bounds = window.native.bounds();
            let pos = Point { x: bounds.x, y: bounds.y };
            let size = WinSize { width: bounds.width, height: bounds.height };
            match window.ctx.services.windows.set_window_pos_and_size(&window.window_id, Some(pos), Some(size)).await {
                Ok(ret) => window.ctx.apply(ret),
                Err(err) => {
                    tracing::warn!(window_id = %window.window_id, error = %err, "window: error sending new window bounds");
                }
            }
        });
    }
}

impl ViewHost for StarWindow {
    fn remove_tab_view(&self, tab_id: &str, force: bool) -> bool {
        let view = {
            let mut state = self.state.lock();
            let is_active = state.active.as_ref().is_some_and(|a| a.tab_id().as_deref() == Some(tab_id));
            if is_active && !force {
                tracing::debug!(window_id = %self.window_id, %tab_id, "window: cannot remove active tab");
                return false;
            }
            let Some(view) = state.loaded.remove(tab_id) else {
                tracing::debug!(window_id = %self.window_id, %tab_id, "window: tab view not loaded");
                return false;
            };
            if is_active {
                state.active = None;
                view.set_active(false);
            }
            view
        };

        if !self.native.is_destroyed() {
            self.native.remove_child_view(view.handle());
        }
        self.ctx.pool.destroy(&view);
        true
    }
}

impl Drop for StarWindow {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for StarWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StarWindow")
            .field("window_id", &self.window_id)
            .field("workspace_id", &state.workspace_id)
            .field("loaded", &state.loaded.len())
            .finish_non_exhaustive()
    }
}
