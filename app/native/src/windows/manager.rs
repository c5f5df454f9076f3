//! Window bookkeeping across the whole shell.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::bounds::{MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, initial_bounds};
use super::context::ShellContext;
use super::window::{NativeWindow, StarWindow, WindowError};
use crate::objects::{WinSize, Window};
use crate::tabs::Bounds;
use crate::utils::spawn_detached;

/// How a window paints behind its tab views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowBackground {
    Transparent,
    Blur,
    Color(String),
}

/// Everything the host needs to create a native window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    pub window_id: String,
    pub bounds: Bounds,
    pub min_width: i32,
    pub min_height: i32,
    pub background: WindowBackground,
}

/// Creates native windows.
pub trait WindowFactory: Send + Sync {
    /// Creates a hidden window.
    fn create_window(&self, options: &WindowOptions) -> Arc<dyn NativeWindow>;

    /// Size of the primary display's work area.
    fn primary_work_area(&self) -> WinSize;
}

/// Owns every open [`StarWindow`].
pub struct WindowManager {
    ctx: Arc<ShellContext>,
    factory: Arc<dyn WindowFactory>,
    windows: DashMap<String, Arc<StarWindow>>,
    /// Last focused window. Kept on blur, cleared when that window closes.
    focused: Mutex<Option<Weak<StarWindow>>>,
}

impl WindowManager {
    #[must_use]
    pub fn new(ctx: Arc<ShellContext>, factory: Arc<dyn WindowFactory>) -> Self {
        Self { ctx, factory, windows: DashMap::new(), focused: Mutex::new(None) }
    }

    #[must_use]
    pub const fn context(&self) -> &Arc<ShellContext> { &self.ctx }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[must_use]
    pub fn get(&self, window_id: &str) -> Option<Arc<StarWindow>> {
        self.windows.get(window_id).map(|w| Arc::clone(w.value()))
    }

    /// The window that has `tab_id` loaded.
    #[must_use]
    pub fn by_tab(&self, tab_id: &str) -> Option<Arc<StarWindow>> {
        self.windows.iter().find(|w| w.has_tab(tab_id)).map(|w| Arc::clone(w.value()))
    }

    /// The window that hosts the platform view `view_id`.
    #[must_use]
    pub fn by_view(&self, view_id: u64) -> Option<Arc<StarWindow>> {
        let tab_id = self.ctx.pool.find_by_view_id(view_id)?.tab_id()?;
        self.by_tab(&tab_id)
    }

    /// The window showing `workspace_id`.
    #[must_use]
    pub fn by_workspace(&self, workspace_id: &str) -> Option<Arc<StarWindow>> {
        self.windows
            .iter()
            .find(|w| w.workspace_id() == workspace_id)
            .map(|w| Arc::clone(w.value()))
    }

    #[must_use]
    pub fn all(&self) -> Vec<Arc<StarWindow>> { self.windows.iter().map(|w| Arc::clone(w.value())).collect() }

    #[must_use]
    pub fn len(&self) -> usize { self.windows.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    #[must_use]
    pub fn focused(&self) -> Option<Arc<StarWindow>> { self.focused.lock().as_ref().and_then(Weak::upgrade) }

    // ========================================================================
    // Creating windows
    // ========================================================================

    /// Builds a window for `window`, or for a fresh backend window when `None`.
    ///
    /// A window whose workspace no longer exists is closed in the backend and
    /// replaced by a fresh one. The window is not shown.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails or the replacement window has
    /// no workspace either.
    pub async fn create_browser_window(&self, window: Option<Window>) -> Result<Arc<StarWindow>, WindowError> {
        let mut window = match window {
            Some(window) => window,
            None => self.create_backend_window("").await?,
        };

        let workspaces = &self.ctx.services.workspaces;
        let workspace = match workspaces.get_workspace(&window.workspaceid).await? {
            Some(workspace) => workspace,
            None => {
                tracing::debug!(window_id = %window.oid, "window: workspace missing, recreating window");
                let ret = self.ctx.services.windows.close_window(&window.oid, true).await?;
                self.ctx.apply(ret);
                window = self.create_backend_window("").await?;
                workspaces
                    .get_workspace(&window.workspaceid)
                    .await?
                    .ok_or_else(|| WindowError::WorkspaceNotFound(window.workspaceid.clone()))?
            }
        };

        let options = WindowOptions {
            window_id: window.oid.clone(),
            bounds: initial_bounds(&window, &self.ctx.config.window, self.factory.primary_work_area()),
            min_width: MIN_WINDOW_WIDTH,
            min_height: MIN_WINDOW_HEIGHT,
            background: self.background(),
        };
        let native = self.factory.create_window(&options);
        let star_window = StarWindow::new(&window.oid, &window.workspaceid, native, Arc::clone(&self.ctx));
        self.windows.insert(window.oid.clone(), Arc::clone(&star_window));
        tracing::info!(window_id = %window.oid, workspace_id = %workspace.oid, "window: opened");

        if !workspace.activetabid.is_empty() {
            star_window.set_active_tab(&workspace.activetabid, false).await;
        }
        Ok(star_window)
    }

    /// Opens and shows a new window for `workspace_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails.
    pub async fn create_window_for_workspace(&self, workspace_id: &str) -> Result<Arc<StarWindow>, WindowError> {
        let window = self.create_backend_window(workspace_id).await?;
        let star_window = self.create_browser_window(Some(window)).await?;
        star_window.show();
        Ok(star_window)
    }

    /// Opens a window: the client's first stored window if none is open, else a fresh one.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails.
    pub async fn create_new_window(&self) -> Result<Arc<StarWindow>, WindowError> {
        let client = self.ctx.services.clients.get_client_data().await?;
        if self.is_empty() {
            if let Some(first) = client.windowids.first() {
                if let Some(existing) = self.ctx.store.load_typed::<Window>(first).await? {
                    tracing::debug!(window_id = %first, "window: reopening stored window");
                    let star_window = self.create_browser_window(Some(existing)).await?;
                    star_window.show();
                    return Ok(star_window);
                }
            }
        }

        let star_window = self.create_browser_window(None).await?;
        star_window.show();
        Ok(star_window)
    }

    /// Closes every window and reopens the client's stored windows.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails. Windows that no longer exist
    /// in the backend are skipped.
    pub async fn relaunch_windows(&self) -> Result<Vec<Arc<StarWindow>>, WindowError> {
        tracing::info!("window: relaunching windows");
        self.ctx.set_relaunching(true);
        let open = self.all();
        if !open.is_empty() {
            for window in &open {
                window.close();
            }
            tokio::time::sleep(self.ctx.config.window.relaunch_delay()).await;
        }
        self.ctx.set_relaunching(false);

        let client = self.ctx.services.clients.get_client_data().await?;
        let mut reopened = Vec::with_capacity(client.windowids.len());
        for window_id in client.windowids.iter().rev() {
            let Some(window) = self.ctx.services.windows.get_window(window_id).await? else {
                tracing::debug!(%window_id, "window: stored window not found, closing");
                let ret = self.ctx.services.windows.close_window(window_id, true).await?;
                self.ctx.apply(ret);
                continue;
            };
            reopened.push(self.create_browser_window(Some(window)).await?);
        }
        for window in &reopened {
            window.show();
        }
        Ok(reopened)
    }

    async fn create_backend_window(&self, workspace_id: &str) -> Result<Window, WindowError> {
        let ret = self.ctx.services.windows.create_window(None, workspace_id).await?;
        Ok(self.ctx.apply(ret))
    }

    fn background(&self) -> WindowBackground {
        let window = &self.ctx.config.window;
        if window.transparent {
            WindowBackground::Transparent
        } else if window.blur {
            WindowBackground::Blur
        } else {
            WindowBackground::Color(window.background_color().to_string())
        }
    }

    // ========================================================================
    // Workspaces and tabs
    // ========================================================================

    /// Shows `workspace_id` in `window_id`.
    ///
    /// If no window shows the workspace yet and the current workspace is
    /// unsaved but holds tabs, a new window is opened instead so those tabs
    /// are not lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the window is unknown or a backend call fails.
    pub async fn switch_workspace(&self, window_id: &str, workspace_id: &str) -> Result<(), WindowError> {
        let window = self.get(window_id).ok_or_else(|| WindowError::NotFound(window_id.to_string()))?;
        if window.workspace_id() == workspace_id {
            tracing::debug!(%window_id, %workspace_id, "window: already on workspace");
            return Ok(());
        }

        let workspaces = &self.ctx.services.workspaces;
        let owned = workspaces
            .list_workspaces()
            .await?
            .iter()
            .any(|entry| entry.workspaceid == workspace_id && entry.has_window());
        if !owned {
            let current = workspaces.get_workspace(&window.workspace_id()).await?;
            if current.is_some_and(|ws| ws.is_non_empty_unsaved()) {
                tracing::debug!(%window_id, %workspace_id, "window: current workspace unsaved, opening new window");
                self.create_window_for_workspace(workspace_id).await?;
                return Ok(());
            }
        }

        window.queue_switch_workspace(workspace_id).await;
        Ok(())
    }

    /// Creates a workspace and shows it in `window_id`, or in a new window.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails.
    pub async fn create_workspace(&self, window_id: Option<&str>) -> Result<Option<String>, WindowError> {
        let ret = self.ctx.services.workspaces.create_workspace("", "", "", true).await?;
        let workspace_id = self.ctx.apply(ret);
        if workspace_id.is_empty() {
            return Ok(None);
        }

        match window_id.and_then(|id| self.get(id)) {
            Some(window) => self.switch_workspace(window.window_id(), &workspace_id).await?,
            None => {
                self.create_window_for_workspace(&workspace_id).await?;
            }
        }
        Ok(Some(workspace_id))
    }

    /// Deletes `workspace_id`. A window showing it moves to the replacement
    /// workspace, or is destroyed when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend call fails.
    pub async fn delete_workspace(&self, workspace_id: &str) -> Result<Option<String>, WindowError> {
        let window = self.by_workspace(workspace_id);
        let ret = self.ctx.services.workspaces.delete_workspace(workspace_id).await?;
        let replacement = self.ctx.apply(ret).filter(|id| !id.is_empty());
        tracing::debug!(%workspace_id, ?replacement, "window: workspace deleted");

        if let Some(window) = window {
            match replacement.as_deref() {
                Some(next) => self.switch_workspace(window.window_id(), next).await?,
                None => window.destroy(),
            }
        }
        Ok(replacement)
    }

    /// Shows `tab_id` in `window_id` and records it as active.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::NotFound`] for an unknown window.
    pub async fn set_active_tab(&self, window_id: &str, tab_id: &str) -> Result<(), WindowError> {
        let window = self.get(window_id).ok_or_else(|| WindowError::NotFound(window_id.to_string()))?;
        window.set_active_tab(tab_id, true).await;
        Ok(())
    }

    /// Creates a tab in `window_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::NotFound`] for an unknown window.
    pub async fn create_tab(&self, window_id: &str, pinned: bool) -> Result<(), WindowError> {
        let window = self.get(window_id).ok_or_else(|| WindowError::NotFound(window_id.to_string()))?;
        window.queue_create_tab(pinned).await;
        Ok(())
    }

    /// Closes `tab_id` in the window showing `workspace_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::NotFound`] if no window shows the workspace.
    pub async fn close_tab(&self, workspace_id: &str, tab_id: &str) -> Result<(), WindowError> {
        let window = self
            .by_workspace(workspace_id)
            .ok_or_else(|| WindowError::NotFound(format!("for workspace {workspace_id}")))?;
        window.queue_close_tab(tab_id).await;
        Ok(())
    }

    // ========================================================================
    // Host events
    // ========================================================================

    /// A window gained focus.
    pub fn on_window_focused(&self, window_id: &str) {
        if self.ctx.is_relaunching() {
            return;
        }
        let Some(window) = self.get(window_id) else {
            return;
        };
        *self.focused.lock() = Some(Arc::downgrade(&window));
        tracing::trace!(%window_id, "window: focused");

        let ctx = Arc::clone(&self.ctx);
        let window_id = window_id.to_string();
        spawn_detached("window: focus", async move {
            match ctx.services.clients.focus_window(&window_id).await {
                Ok(ret) => ctx.apply(ret),
                Err(err) => tracing::warn!(%window_id, error = %err, "window: FocusWindow failed"),
            }
        });
    }

    /// The host asks whether a window may close. Returns `true` to allow it.
    ///
    /// Closing any window but the last, or the last one when it should not
    /// be kept, also deletes it in the backend once it has closed.
    pub fn on_close_requested(&self, window_id: &str) -> bool {
        let Some(window) = self.get(window_id) else {
            return true;
        };
        if window.can_close() || self.ctx.is_quitting() || self.ctx.is_relaunching() {
            return true;
        }
        if self.len() > 1 || !self.ctx.config.window.save_last_window {
            window.set_delete_allowed(true);
        }
        window.set_can_close(true);
        true
    }

    /// A window has closed. Safe to call more than once.
    pub fn on_window_closed(&self, window_id: &str) {
        if self.ctx.is_quitting() {
            return;
        }
        let Some((_, window)) = self.windows.remove(window_id) else {
            return;
        };
        tracing::info!(%window_id, "window: closed");

        {
            let mut focused = self.focused.lock();
            if focused.as_ref().is_some_and(|f| f.as_ptr() == Arc::as_ptr(&window)) {
                *focused = None;
            }
        }

        window.stop_bounds_poller();
        window.remove_all_child_views();
        self.ctx.pool.unregister_host(window_id);

        if self.ctx.is_relaunching() {
            window.native().destroy();
            return;
        }
        if window.delete_allowed() {
            let ctx = Arc::clone(&self.ctx);
            let window_id = window_id.to_string();
            spawn_detached("window: close in backend", async move {
                match ctx.services.windows.close_window(&window_id, true).await {
                    Ok(ret) => ctx.apply(ret),
                    Err(err) => tracing::warn!(%window_id, error = %err, "window: CloseWindow failed"),
                }
            });
        }
    }

    /// Marks the process as quitting; closing windows then keeps them in the backend.
    pub fn set_quitting(&self, quitting: bool) { self.ctx.set_quitting(quitting); }

    /// Tears every window down without touching the backend.
    pub fn dispose(&self) {
        let windows = self.all();
        self.windows.clear();
        *self.focused.lock() = None;
        for window in windows {
            window.stop_bounds_poller();
            window.remove_all_child_views();
            self.ctx.pool.unregister_host(window.window_id());
        }
    }
}

impl std::fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager").field("windows", &self.len()).finish_non_exhaustive()
    }
}
