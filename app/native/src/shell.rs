//! The assembled core: router, object cache, tab view pool and windows.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::StarConfig;
use crate::constants::EVENT_OBJECT_UPDATE;
use crate::error::StarError;
use crate::events::{EventRouter, EventSubscription, RpcTransport, StarEvent, Subscription};
use crate::objects::{ObjectStore, StarObjUpdate};
use crate::services::Services;
use crate::tabs::{TabViewPool, ViewFactory, ViewStyle};
use crate::windows::{ShellContext, WindowFactory, WindowManager};

/// Everything the host provides to build a [`StarShell`].
pub struct ShellOptions {
    pub config: StarConfig,
    pub services: Services,
    pub transport: Arc<dyn RpcTransport>,
    pub view_factory: Arc<dyn ViewFactory>,
    pub window_factory: Arc<dyn WindowFactory>,
}

/// One instance per process (or per test).
pub struct StarShell {
    router: EventRouter,
    windows: WindowManager,
    ctx: Arc<ShellContext>,
    updates: Mutex<Option<EventSubscription>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl StarShell {
    /// Wires the components together and subscribes the cache to pushed
    /// object updates. The periodic cache sweep only starts when called
    /// inside a tokio runtime.
    #[must_use]
    pub fn new(options: ShellOptions) -> Self {
        let ShellOptions { config, services, transport, view_factory, window_factory } = options;
        let config = Arc::new(config);

        let router = EventRouter::new(transport);
        let store = ObjectStore::new(Arc::clone(&services.objects), &config.object_store);
        let style = ViewStyle { background_color: config.window.background_color().to_string() };
        let pool = TabViewPool::new(view_factory, &config.tab_cache, style);

        let updates = {
            let store = store.clone();
            router.subscribe(vec![Subscription::new(EVENT_OBJECT_UPDATE, move |event: &StarEvent| {
                match event.decode::<StarObjUpdate>() {
                    Ok(update) => store.apply_update(&update),
                    Err(err) => tracing::warn!(error = %err, "objects: malformed object update event"),
                }
            })])
        };

        let sweeper = Handle::try_current()
            .is_ok()
            .then(|| store.spawn_sweeper(config.object_store.sweep_interval()));

        let ctx = Arc::new(ShellContext::new(services, store, pool, Arc::clone(&config)));
        let windows = WindowManager::new(Arc::clone(&ctx), window_factory);
        tracing::info!("shell: started");

        Self {
            router,
            windows,
            ctx,
            updates: Mutex::new(Some(updates)),
            sweeper: Mutex::new(sweeper),
        }
    }

    #[must_use]
    pub const fn router(&self) -> &EventRouter { &self.router }

    #[must_use]
    pub fn store(&self) -> &ObjectStore { &self.ctx.store }

    #[must_use]
    pub fn pool(&self) -> &TabViewPool { &self.ctx.pool }

    #[must_use]
    pub const fn windows(&self) -> &WindowManager { &self.windows }

    #[must_use]
    pub const fn context(&self) -> &Arc<ShellContext> { &self.ctx }

    #[must_use]
    pub fn config(&self) -> &StarConfig { &self.ctx.config }

    // ========================================================================
    // Inbound traffic
    // ========================================================================

    /// Routes a pushed event to its handlers. Returns how many ran.
    pub fn handle_event(&self, event: &StarEvent) -> usize { self.router.dispatch(event) }

    /// Parses a JSON event and routes it.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid event.
    pub fn handle_raw_event(&self, raw: &str) -> Result<usize, StarError> {
        let event: StarEvent = serde_json::from_str(raw)?;
        Ok(self.handle_event(&event))
    }

    /// The transport reconnected; restores the backend's subscriptions.
    pub fn on_reconnect(&self) {
        tracing::info!("shell: transport reconnected");
        self.router.on_reconnect();
    }

    /// Stops the sweeper, tears down windows and tab views and empties the cache.
    pub fn dispose(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.abort();
        }
        if let Some(updates) = self.updates.lock().take() {
            updates.unsubscribe();
        }
        self.windows.dispose();
        self.ctx.pool.destroy_all();
        self.ctx.store.clear();
        self.router.clear();
        tracing::info!("shell: disposed");
    }
}

impl Drop for StarShell {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.abort();
        }
    }
}

impl std::fmt::Debug for StarShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarShell")
            .field("objects", &self.ctx.store.len())
            .field("tab_views", &self.ctx.pool.len())
            .field("windows", &self.windows.len())
            .finish_non_exhaustive()
    }
}
