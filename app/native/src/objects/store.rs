//! The object cache.
//!
//! One [`CacheEntry`] per [`ORef`], fetched lazily from the [`ObjectService`]
//! and kept current by pushed updates.
//!
//! # Ordering
//!
//! Fetch results and pushed updates are merged by version: an upsert only
//! replaces the cached value when its version is strictly greater. Deletes,
//! explicit reloads and local writes are authoritative and always apply. A
//! local write also supersedes any fetch still in flight for the same object,
//! so a late fetch response cannot overwrite it.
//!
//! # Lifetime
//!
//! Entries are reference counted by [`Pinned`] and [`ObjectSubscription`]
//! guards. Unreferenced entries survive for the hold window after their last
//! access or update and are then removed by [`ObjectStore::sweep`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use eyeball::Subscriber;
use futures::FutureExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::entry::{
    CacheEntry, DataItem, EntryGuard, EntryState, FetchOutcome, PendingFetch, SharedFetch,
};
use super::oref::{ORef, ORefError};
use super::types::{ObjectError, StarObj, StarObjUpdate, StarObject, UpdateType};
use crate::config::ObjectStoreConfig;
use crate::constants::EVENT_OBJECT_UPDATE;
use crate::events::{EventRouter, EventSubscription, StarEvent, Subscription};
use crate::services::{BackendError, ObjectService, ServiceReturn};
use crate::utils::spawn_detached;

/// Errors surfaced by cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The backend answered with a different object than requested.
    #[error("requested {expected}, backend returned {found}")]
    Mismatch { expected: ORef, found: String },
    /// The reference could not be built.
    #[error(transparent)]
    InvalidRef(#[from] ORefError),
    /// The cached object does not convert to the requested model.
    #[error(transparent)]
    Conversion(#[from] ObjectError),
}

struct StoreInner {
    entries: DashMap<ORef, Arc<CacheEntry>>,
    objects: Arc<dyn ObjectService>,
    hold_time: Duration,
}

/// Shared, cloneable handle to the object cache.
#[derive(Clone)]
pub struct ObjectStore {
    inner: Arc<StoreInner>,
}

impl ObjectStore {
    #[must_use]
    pub fn new(objects: Arc<dyn ObjectService>, config: &ObjectStoreConfig) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: DashMap::new(),
                objects,
                hold_time: config.hold_time(),
            }),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize { self.inner.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.inner.entries.is_empty() }

    #[must_use]
    pub fn contains(&self, oref: &ORef) -> bool { self.inner.entries.contains_key(oref) }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Returns the entry for `oref`.
    ///
    /// A missing entry is created when `create_if_missing` is set, and its
    /// fetch starts immediately. Access refreshes the idle expiry.
    pub fn get(&self, oref: &ORef, create_if_missing: bool) -> Option<Arc<CacheEntry>> {
        if let Some(entry) = self.lookup(oref) {
            entry.touch();
            return Some(entry);
        }
        if !create_if_missing {
            return None;
        }

        let entry = self.entry_or_insert(oref, true);
        self.pending_or_start(&entry);
        Some(entry)
    }

    /// Current cached value, without creating an entry or fetching.
    #[must_use]
    pub fn value_of(&self, oref: &ORef) -> Option<StarObj> {
        self.lookup(oref).and_then(|entry| entry.value())
    }

    /// Resolves with the cached value once no fetch is outstanding.
    ///
    /// Concurrent callers share the single in-flight fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the fetch this call waited on failed.
    pub async fn load(&self, oref: &ORef) -> Result<Option<StarObj>, ObjectStoreError> {
        let entry = self.entry_or_insert(oref, true);
        entry.touch();
        Self::settle(self.pending_or_start(&entry), &entry).await
    }

    /// Like [`load`](Self::load) but converts into a typed model.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is invalid, the fetch fails, or the object
    /// does not convert into `T`.
    pub async fn load_typed<T: StarObject>(&self, oid: &str) -> Result<Option<T>, ObjectStoreError> {
        let oref = ORef::new(T::OTYPE, oid)?;
        match self.load(&oref).await? {
            Some(obj) => Ok(Some(obj.to_typed()?)),
            None => Ok(None),
        }
    }

    /// Loads `oref` and keeps the entry referenced until the guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the reference is released in that case.
    pub async fn pin(&self, oref: &ORef) -> Result<Pinned, ObjectStoreError> {
        let entry = self.entry_or_insert(oref, true);
        let guard = entry.pin();
        let value = Self::settle(self.pending_or_start(&entry), &entry).await?;
        Ok(Pinned { guard, value })
    }

    /// Subscribes to `oref`, creating and fetching the entry if needed.
    ///
    /// The entry stays referenced while the subscription lives.
    #[must_use]
    pub fn subscribe(&self, oref: &ORef) -> ObjectSubscription {
        let entry = self.entry_or_insert(oref, true);
        let guard = entry.pin();
        self.pending_or_start(&entry);
        let subscriber = entry.subscribe();
        ObjectSubscription { guard, subscriber }
    }

    /// Fetches `oref` again and stores the result without a version check.
    ///
    /// Any fetch already in flight is superseded.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn reload(&self, oref: &ORef) -> Result<Option<StarObj>, ObjectStoreError> {
        let entry = self.entry_or_insert(oref, false);
        let future = {
            let mut state = entry.state.lock();
            if state.pending.is_some() {
                tracing::debug!(%oref, "objects: reload supersedes in-flight fetch");
            }
            let future = self.begin_fetch(&entry, &mut state, true);
            CacheEntry::touch_state(&mut state, entry.hold_time());
            future
        };
        drive(&future);
        future.await?;
        Ok(entry.value())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Applies one pushed or companion update.
    ///
    /// Deletes always clear the value and supersede any fetch in flight. Upserts are dropped when the object is
    /// invalid or not newer than the cached one. Unknown objects get an entry
    /// seeded from the update without a fetch.
    pub fn apply_update(&self, update: &StarObjUpdate) {
        let oref = match ORef::new(update.otype.clone(), update.oid.clone()) {
            Ok(oref) => oref,
            Err(err) => {
                tracing::debug!(error = %err, "objects: ignoring update with invalid reference");
                return;
            }
        };

        match update.updatetype {
            UpdateType::Delete => {
                let entry = self.entry_or_insert(&oref, false);
                let mut state = entry.state.lock();
                if state.pending.take().is_some() {
                    tracing::debug!(%oref, "objects: delete supersedes in-flight fetch");
                }
                state.generation += 1;
                state.needs_fetch = false;
                CacheEntry::touch_state(&mut state, entry.hold_time());
                entry.set_data(DataItem { value: None, loading: false });
                tracing::trace!(%oref, "objects: deleted");
            }
            UpdateType::Update => {
                let Some(obj) = update.obj.as_ref() else {
                    tracing::debug!(%oref, "objects: ignoring update without object");
                    return;
                };
                if !obj.is_valid() || obj.otype != update.otype || obj.oid != update.oid {
                    tracing::debug!(%oref, version = obj.version, "objects: ignoring invalid object");
                    return;
                }

                let entry = self.entry_or_insert(&oref, false);
                let mut state = entry.state.lock();
                CacheEntry::touch_state(&mut state, entry.hold_time());

                let current = entry.data();
                let cached = current.value.as_ref().map(|cur| cur.version);
                if let Some(cached) = cached.filter(|v| *v >= obj.version) {
                    tracing::debug!(%oref, cached, incoming = obj.version, "objects: ignoring stale update");
                    return;
                }
                entry.set_data(DataItem { value: Some(obj.clone()), loading: current.loading });
                tracing::trace!(%oref, version = obj.version, "objects: updated");
            }
        }
    }

    /// Applies a batch of updates in order.
    pub fn apply_updates(&self, updates: &[StarObjUpdate]) {
        for update in updates {
            self.apply_update(update);
        }
    }

    /// Applies the companion updates of a service response and returns its payload.
    pub fn apply_service_return<T>(&self, ret: ServiceReturn<T>) -> T {
        self.apply_updates(&ret.updates);
        ret.data
    }

    /// Overwrites the cached value of an already cached object.
    ///
    /// Any fetch in flight for the object is superseded. With `push_to_server`
    /// the object is also sent to the backend without waiting; failures are
    /// logged. Returns `false` when the object is not cached.
    pub fn set_value(&self, obj: StarObj, push_to_server: bool) -> bool {
        let oref = match obj.oref() {
            Ok(oref) => oref,
            Err(err) => {
                tracing::warn!(error = %err, "objects: set_value with invalid reference");
                return false;
            }
        };
        let Some(entry) = self.lookup(&oref) else {
            tracing::debug!(%oref, "objects: set_value on uncached object");
            return false;
        };

        {
            let mut state = entry.state.lock();
            if state.pending.take().is_some() {
                tracing::debug!(%oref, "objects: local write supersedes in-flight fetch");
            }
            state.generation += 1;
            state.needs_fetch = false;
            CacheEntry::touch_state(&mut state, entry.hold_time());
            entry.set_data(DataItem { value: Some(obj.clone()), loading: false });
        }

        if push_to_server {
            let store = Arc::downgrade(&self.inner);
            let objects = Arc::clone(&self.inner.objects);
            spawn_detached("objects: push update", async move {
                match objects.update_object(obj, false).await {
                    Ok(ret) => {
                        if let Some(inner) = store.upgrade() {
                            Self { inner }.apply_updates(&ret.updates);
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%oref, error = %err, "objects: failed to push update");
                    }
                }
            });
        }
        true
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Removes unreferenced entries whose hold window has passed.
    ///
    /// Returns the number of removed entries.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.entries.len();
        self.inner
            .entries
            .retain(|_, entry| entry.ref_count() > 0 || entry.hold_until() >= now);
        let purged = before.saturating_sub(self.inner.entries.len());
        if purged > 0 {
            tracing::trace!(purged, "objects: swept idle entries");
        }
        purged
    }

    /// Drops every entry.
    pub fn clear(&self) { self.inner.entries.clear(); }

    /// Runs [`sweep`](Self::sweep) every `interval` until the store is dropped.
    #[must_use]
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let store = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = store.upgrade() else {
                    break;
                };
                Self { inner }.sweep();
            }
        })
    }

    /// Routes pushed updates for `oref` into the cache.
    ///
    /// The handler holds the store weakly.
    pub fn subscribe_to_object(&self, router: &EventRouter, oref: &ORef) -> EventSubscription {
        let store: Weak<StoreInner> = Arc::downgrade(&self.inner);
        router.subscribe(vec![Subscription::scoped(
            EVENT_OBJECT_UPDATE,
            oref.to_string(),
            move |event: &StarEvent| {
                let Some(inner) = store.upgrade() else {
                    return;
                };
                match event.decode::<StarObjUpdate>() {
                    Ok(update) => Self { inner }.apply_update(&update),
                    Err(err) => {
                        tracing::warn!(error = %err, "objects: malformed object update event");
                    }
                }
            },
        )])
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lookup(&self, oref: &ORef) -> Option<Arc<CacheEntry>> {
        self.inner.entries.get(oref).map(|entry| Arc::clone(entry.value()))
    }

    fn entry_or_insert(&self, oref: &ORef, needs_fetch: bool) -> Arc<CacheEntry> {
        match self.inner.entries.entry(oref.clone()) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                let entry = Arc::new(CacheEntry::new(oref.clone(), self.inner.hold_time, needs_fetch));
                vacant.insert(Arc::clone(&entry));
                entry
            }
        }
    }

    /// Returns the in-flight fetch, starting one if the entry still needs it.
    fn pending_or_start(&self, entry: &Arc<CacheEntry>) -> Option<SharedFetch> {
        let (future, started) = {
            let mut state = entry.state.lock();
            if let Some(pending) = state.pending.as_ref() {
                (Some(pending.future.clone()), false)
            } else if state.needs_fetch {
                (Some(self.begin_fetch(entry, &mut state, false)), true)
            } else {
                (None, false)
            }
        };
        if let (true, Some(future)) = (started, future.as_ref()) {
            drive(future);
        }
        future
    }

    /// Installs a new fetch as the entry's pending fetch. Called with the state lock held.
    fn begin_fetch(
        &self,
        entry: &Arc<CacheEntry>,
        state: &mut EntryState,
        authoritative: bool,
    ) -> SharedFetch {
        state.generation += 1;
        state.needs_fetch = false;
        let generation = state.generation;

        let objects = Arc::clone(&self.inner.objects);
        let target = Arc::downgrade(entry);
        let oref = entry.oref().clone();
        let future = async move {
            let result = objects.get_object(&oref).await;
            match target.upgrade() {
                Some(entry) => complete_fetch(&entry, generation, authoritative, result),
                None => result.map(|_| ()).map_err(ObjectStoreError::from),
            }
        }
        .boxed()
        .shared();

        state.pending = Some(PendingFetch { generation, future: future.clone() });
        entry.set_loading(true);
        tracing::trace!(oref = %entry.oref(), generation, "objects: fetch started");
        future
    }

    async fn settle(
        pending: Option<SharedFetch>,
        entry: &CacheEntry,
    ) -> Result<Option<StarObj>, ObjectStoreError> {
        if let Some(future) = pending {
            future.await?;
        }
        Ok(entry.value())
    }
}

/// Applies a finished fetch to its entry, unless a newer fetch or a local
/// write has superseded it.
fn complete_fetch(
    entry: &CacheEntry,
    generation: u64,
    authoritative: bool,
    result: Result<Option<StarObj>, BackendError>,
) -> FetchOutcome {
    let oref = entry.oref();
    let mut state = entry.state.lock();

    let current = state.pending.as_ref().is_some_and(|p| p.generation == generation);
    if !current {
        tracing::debug!(%oref, generation, "objects: discarding superseded fetch result");
        return result.map(|_| ()).map_err(ObjectStoreError::from);
    }
    state.pending = None;

    let fetched = match result {
        Ok(fetched) => fetched,
        Err(err) => {
            state.needs_fetch = true;
            entry.set_loading(false);
            tracing::warn!(%oref, error = %err, "objects: fetch failed");
            return Err(err.into());
        }
    };

    let foreign = fetched.as_ref().filter(|obj| obj.otype != oref.otype() || obj.oid != oref.oid());
    if let Some(obj) = foreign {
        state.needs_fetch = true;
        entry.set_loading(false);
        return Err(ObjectStoreError::Mismatch {
            expected: oref.clone(),
            found: format!("{}:{}", obj.otype, obj.oid),
        });
    }

    CacheEntry::touch_state(&mut state, entry.hold_time());
    let current = entry.data();
    let apply = authoritative
        || match (current.value.as_ref(), fetched.as_ref()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(cur), Some(new)) => new.version > cur.version,
        };

    if apply {
        entry.set_data(DataItem { value: fetched, loading: false });
    } else {
        tracing::debug!(%oref, "objects: fetched value older than cached value");
        entry.set_loading(false);
    }
    Ok(())
}

/// Polls a fetch to completion in the background so it runs even if no caller awaits it.
fn drive(future: &SharedFetch) {
    let future = future.clone();
    spawn_detached("objects: fetch", async move {
        let _ = future.await;
    });
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore").field("entries", &self.len()).finish_non_exhaustive()
    }
}

/// A loaded object kept in the cache while this guard lives.
#[derive(Debug)]
pub struct Pinned {
    guard: EntryGuard,
    value: Option<StarObj>,
}

impl Pinned {
    /// The value at the time the load finished.
    #[must_use]
    pub const fn value(&self) -> Option<&StarObj> { self.value.as_ref() }

    /// The value the cache holds now.
    #[must_use]
    pub fn current(&self) -> Option<StarObj> { self.guard.entry().value() }

    #[must_use]
    pub const fn entry(&self) -> &Arc<CacheEntry> { self.guard.entry() }
}

/// Live view of one cache entry; keeps the entry referenced.
pub struct ObjectSubscription {
    guard: EntryGuard,
    subscriber: Subscriber<DataItem>,
}

impl std::fmt::Debug for ObjectSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectSubscription").field("entry", self.guard.entry()).finish_non_exhaustive()
    }
}

impl ObjectSubscription {
    /// Current value and loading flag.
    #[must_use]
    pub fn get(&self) -> DataItem { self.guard.entry().data() }

    /// Waits for the next change. Returns `None` once the entry is gone.
    pub async fn next(&mut self) -> Option<DataItem> { self.subscriber.next().await }

    #[must_use]
    pub const fn entry(&self) -> &Arc<CacheEntry> { self.guard.entry() }
}
