//! Backend objects and the client-side object cache.

mod entry;
mod oref;
mod store;
mod types;

pub use entry::{CacheEntry, DataItem, EntryGuard};
pub use oref::{ORef, ORefError};
pub use store::{ObjectStore, ObjectStoreError, ObjectSubscription, Pinned};
pub use types::{
    Client, CloseTabResult, LayoutState, ObjectError, Point, StarObj, StarObjUpdate, StarObject, Tab,
    UpdateType, WinSize, Window, Workspace, WorkspaceListEntry,
};
