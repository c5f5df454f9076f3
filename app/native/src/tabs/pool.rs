//! Bounded pool of tab views shared by every window.
//!
//! Views are keyed by tab id. One unbound hot spare is kept ready so a new
//! tab can skip most of the renderer start-up. When the pool grows past its
//! budget, the least recently used inactive views are evicted through the
//! window that hosts them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;

use super::view::{TabView, ViewFactory, ViewStyle};
use crate::config::TabCacheConfig;
use crate::utils::spawn_in_runtime;

/// A window that can detach tab views on the pool's behalf.
pub trait ViewHost: Send + Sync {
    /// Detaches and destroys the view of `tab_id`.
    ///
    /// Without `force` the host refuses to remove its active tab. Returns
    /// whether the view was removed.
    fn remove_tab_view(&self, tab_id: &str, force: bool) -> bool;
}

struct PoolInner {
    views: Mutex<HashMap<String, Arc<TabView>>>,
    spare: Mutex<Option<Arc<TabView>>>,
    hosts: RwLock<HashMap<String, Weak<dyn ViewHost>>>,
    factory: Arc<dyn ViewFactory>,
    style: RwLock<ViewStyle>,
    max_size: AtomicUsize,
    evict_idle: Duration,
    spare_delay: Duration,
    spare_scheduled: AtomicBool,
}

/// Shared handle to the tab view pool.
#[derive(Clone)]
pub struct TabViewPool {
    inner: Arc<PoolInner>,
}

impl TabViewPool {
    #[must_use]
    pub fn new(factory: Arc<dyn ViewFactory>, config: &TabCacheConfig, style: ViewStyle) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                views: Mutex::new(HashMap::new()),
                spare: Mutex::new(None),
                hosts: RwLock::new(HashMap::new()),
                factory,
                style: RwLock::new(style),
                max_size: AtomicUsize::new(config.max_size),
                evict_idle: config.eviction_idle(),
                spare_delay: config.spare_delay(),
                spare_scheduled: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.inner.views.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.inner.views.lock().is_empty() }

    #[must_use]
    pub fn contains(&self, tab_id: &str) -> bool { self.inner.views.lock().contains_key(tab_id) }

    #[must_use]
    pub fn max_size(&self) -> usize { self.inner.max_size.load(Ordering::Relaxed) }

    pub fn set_max_size(&self, size: usize) {
        tracing::debug!(size, "tabs: max cache size changed");
        self.inner.max_size.store(size, Ordering::Relaxed);
    }

    /// Style applied to views created from now on.
    pub fn set_style(&self, style: ViewStyle) { *self.inner.style.write() = style; }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Returns the resident view of `tab_id` and marks it used.
    #[must_use]
    pub fn get(&self, tab_id: &str) -> Option<Arc<TabView>> {
        let view = self.peek(tab_id)?;
        view.touch();
        Some(view)
    }

    fn peek(&self, tab_id: &str) -> Option<Arc<TabView>> { self.inner.views.lock().get(tab_id).cloned() }

    /// Looks a view up by its platform id.
    #[must_use]
    pub fn find_by_view_id(&self, view_id: u64) -> Option<Arc<TabView>> {
        self.inner.views.lock().values().find(|v| v.view_id() == view_id).cloned()
    }

    /// Every resident view.
    #[must_use]
    pub fn views(&self) -> Vec<Arc<TabView>> { self.inner.views.lock().values().cloned().collect() }

    /// Returns the view of `tab_id`, taking the spare for a new one.
    ///
    /// The flag is `true` when the view was already resident and bound.
    pub fn get_or_create(&self, window_id: &str, tab_id: &str) -> (Arc<TabView>, bool) {
        if let Some(view) = self.get(tab_id) {
            return (view, true);
        }

        let view = self.take_spare();
        view.bind(window_id, tab_id);
        self.set_view(tab_id, Arc::clone(&view));
        self.inner.factory.register_handlers(&view);
        tracing::debug!(%window_id, %tab_id, view_id = view.view_id(), "tabs: bound new tab view");
        (view, false)
    }

    /// Inserts or replaces the view of `tab_id`, then enforces the budget.
    pub fn set_view(&self, tab_id: &str, view: Arc<TabView>) {
        if tab_id.is_empty() {
            return;
        }
        self.inner.views.lock().insert(tab_id.to_string(), view);
        self.check_and_evict();
    }

    // ========================================================================
    // Hot spare
    // ========================================================================

    #[must_use]
    pub fn has_spare(&self) -> bool { self.inner.spare.lock().is_some() }

    /// Hands out the spare, or a fresh view if there is none, and schedules a replacement.
    pub fn take_spare(&self) -> Arc<TabView> {
        self.schedule_spare();
        if let Some(spare) = self.inner.spare.lock().take() {
            tracing::trace!(view_id = spare.view_id(), "tabs: using hot spare");
            return spare;
        }
        tracing::trace!("tabs: no hot spare, creating view");
        self.create_view()
    }

    /// Creates the spare now if there is none.
    pub fn ensure_spare(&self) {
        let mut spare = self.inner.spare.lock();
        if spare.is_none() {
            *spare = Some(self.create_view());
        }
    }

    /// Replenishes the spare after the configured delay. Does not stack.
    pub fn schedule_spare(&self) {
        if self.inner.spare_scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        let pool = Arc::downgrade(&self.inner);
        let delay = self.inner.spare_delay;
        let spawned = spawn_in_runtime("tabs: hot spare", async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = pool.upgrade() {
                inner.spare_scheduled.store(false, Ordering::Release);
                Self { inner }.ensure_spare();
            }
        });
        if spawned.is_none() {
            self.inner.spare_scheduled.store(false, Ordering::Release);
        }
    }

    fn create_view(&self) -> Arc<TabView> {
        let style = self.inner.style.read().clone();
        TabView::create(self.inner.factory.as_ref(), &style)
    }

    // ========================================================================
    // Eviction
    // ========================================================================

    /// Evicts least recently used inactive views while the pool is over budget.
    ///
    /// Returns the number of evicted views.
    pub fn check_and_evict(&self) -> usize {
        let max_size = self.max_size();
        let (resident, mut candidates) = {
            let views = self.inner.views.lock();
            let candidates: Vec<(String, Instant)> = views
                .iter()
                .filter(|(_, view)| !view.is_active())
                .map(|(tab_id, view)| (tab_id.clone(), view.last_used()))
                .collect();
            (views.len(), candidates)
        };
        if resident <= max_size {
            return 0;
        }

        candidates.sort_by_key(|(_, last_used)| *last_used);
        let excess = resident - max_size;
        let mut evicted = 0;
        for (tab_id, _) in candidates {
            if evicted >= excess {
                break;
            }
            if self.try_evict(&tab_id) {
                evicted += 1;
            }
        }

        if evicted < excess {
            tracing::debug!(resident, max_size, evicted, "tabs: cache over budget, nothing else evictable");
        }
        evicted
    }

    /// Evicts one view unless it is active or was used too recently.
    pub fn try_evict(&self, tab_id: &str) -> bool {
        let Some(view) = self.peek(tab_id) else {
            return false;
        };
        if view.is_active() {
            return false;
        }
        if view.last_used().elapsed() < self.inner.evict_idle {
            return false;
        }

        let host = view.window_id().and_then(|window_id| self.host(&window_id));
        match host {
            Some(host) => {
                tracing::debug!(%tab_id, "tabs: evicting tab view");
                host.remove_tab_view(tab_id, false)
            }
            None => {
                tracing::error!(
                    %tab_id,
                    window_id = ?view.window_id(),
                    "tabs: window not found for cached tab view, destroying"
                );
                self.destroy(&view);
                true
            }
        }
    }

    /// Tries to evict every resident view. Returns how many went.
    pub fn clear_tab_cache(&self) -> usize {
        let tab_ids: Vec<String> = self.inner.views.lock().keys().cloned().collect();
        tab_ids.iter().filter(|tab_id| self.try_evict(tab_id)).count()
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Removes `view` from the pool and closes it.
    pub fn destroy(&self, view: &Arc<TabView>) {
        self.forget(view);
        view.close();
    }

    /// Handles a platform view that the host destroyed on its own.
    pub fn on_view_destroyed(&self, view_id: u64) {
        {
            let mut spare = self.inner.spare.lock();
            if spare.as_ref().is_some_and(|s| s.view_id() == view_id) {
                if let Some(spare) = spare.take() {
                    spare.mark_destroyed();
                }
                return;
            }
        }
        if let Some(view) = self.find_by_view_id(view_id) {
            view.mark_destroyed();
            self.forget(&view);
        }
    }

    fn forget(&self, view: &Arc<TabView>) {
        let Some(tab_id) = view.tab_id() else {
            return;
        };
        let mut views = self.inner.views.lock();
        if views.get(&tab_id).is_some_and(|v| Arc::ptr_eq(v, view)) {
            views.remove(&tab_id);
        }
    }

    /// Closes every view, including the spare, without involving the windows.
    pub fn destroy_all(&self) {
        let views: Vec<Arc<TabView>> = self.inner.views.lock().drain().map(|(_, v)| v).collect();
        let spare = self.inner.spare.lock().take();
        for view in views.iter().chain(spare.iter()) {
            view.close();
        }
    }

    // ========================================================================
    // Hosts
    // ========================================================================

    pub fn register_host(&self, window_id: &str, host: Weak<dyn ViewHost>) {
        self.inner.hosts.write().insert(window_id.to_string(), host);
    }

    pub fn unregister_host(&self, window_id: &str) { self.inner.hosts.write().remove(window_id); }

    fn host(&self, window_id: &str) -> Option<Arc<dyn ViewHost>> {
        self.inner.hosts.read().get(window_id).and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for TabViewPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabViewPool")
            .field("len", &self.len())
            .field("max_size", &self.max_size())
            .field("has_spare", &self.has_spare())
            .finish_non_exhaustive()
    }
}
