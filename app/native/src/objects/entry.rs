//! Per-object cache entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eyeball::{SharedObservable, Subscriber};
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::oref::ORef;
use super::store::ObjectStoreError;
use super::types::StarObj;

/// Snapshot of an entry as seen by readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataItem {
    pub value: Option<StarObj>,
    pub loading: bool,
}

/// Outcome of one fetch, shared by every caller awaiting it.
pub(crate) type FetchOutcome = Result<(), ObjectStoreError>;

/// Handle to an in-flight fetch.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

pub(crate) struct PendingFetch {
    pub(crate) generation: u64,
    pub(crate) future: SharedFetch,
}

pub(crate) struct EntryState {
    /// At most one fetch is outstanding per entry.
    pub(crate) pending: Option<PendingFetch>,
    /// Bumped by every fetch start and every local write. A fetch only applies
    /// its result while its generation is still current.
    pub(crate) generation: u64,
    /// Set for new entries and after a failed fetch.
    pub(crate) needs_fetch: bool,
    pub(crate) hold_until: Instant,
}

/// Cached state for one [`ORef`].
pub struct CacheEntry {
    oref: ORef,
    data: SharedObservable<DataItem>,
    ref_count: AtomicUsize,
    hold_time: Duration,
    pub(crate) state: Mutex<EntryState>,
}

impl CacheEntry {
    pub(crate) fn new(oref: ORef, hold_time: Duration, needs_fetch: bool) -> Self {
        Self {
            oref,
            data: SharedObservable::new(DataItem::default()),
            ref_count: AtomicUsize::new(0),
            hold_time,
            state: Mutex::new(EntryState {
                pending: None,
                generation: 0,
                needs_fetch,
                hold_until: Instant::now() + hold_time,
            }),
        }
    }

    #[must_use]
    pub const fn oref(&self) -> &ORef { &self.oref }

    /// Current value and loading flag.
    #[must_use]
    pub fn data(&self) -> DataItem { self.data.get() }

    #[must_use]
    pub fn value(&self) -> Option<StarObj> { self.data.get().value }

    #[must_use]
    pub fn is_loading(&self) -> bool { self.data.get().loading }

    #[must_use]
    pub fn ref_count(&self) -> usize { self.ref_count.load(Ordering::Acquire) }

    /// Subscribes to every change of this entry.
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<DataItem> { self.data.subscribe() }

    #[must_use]
    pub fn has_pending_fetch(&self) -> bool { self.state.lock().pending.is_some() }

    pub(crate) fn hold_until(&self) -> Instant { self.state.lock().hold_until }

    /// Pushes the idle expiry out by the hold window.
    pub(crate) fn touch(&self) { Self::touch_state(&mut self.state.lock(), self.hold_time); }

    pub(crate) fn touch_state(state: &mut EntryState, hold_time: Duration) {
        state.hold_until = Instant::now() + hold_time;
    }

    pub(crate) const fn hold_time(&self) -> Duration { self.hold_time }

    pub(crate) fn retain(&self) { self.ref_count.fetch_add(1, Ordering::AcqRel); }

    pub(crate) fn release(&self) {
        let prev = self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);
        if prev == 1 {
            self.touch();
        } else if prev == 0 {
            tracing::warn!(oref = %self.oref, "objects: released an entry with no references");
        }
    }

    /// Replaces the data. Callers hold the state lock so writes are ordered
    /// with fetch bookkeeping.
    pub(crate) fn set_data(&self, item: DataItem) { self.data.set(item); }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.data.update(|item| item.loading = loading);
    }

    /// Pins the entry for as long as the returned guard lives.
    pub(crate) fn pin(self: &Arc<Self>) -> EntryGuard {
        self.retain();
        EntryGuard { entry: Arc::clone(self) }
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("oref", &self.oref)
            .field("data", &self.data())
            .field("ref_count", &self.ref_count())
            .finish_non_exhaustive()
    }
}

/// Holds one reference on a [`CacheEntry`]; releases it on drop.
#[derive(Debug)]
pub struct EntryGuard {
    entry: Arc<CacheEntry>,
}

impl EntryGuard {
    #[must_use]
    pub const fn entry(&self) -> &Arc<CacheEntry> { &self.entry }
}

impl Drop for EntryGuard {
    fn drop(&mut self) { self.entry.release(); }
}
