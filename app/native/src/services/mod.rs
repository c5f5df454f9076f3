//! Backend service interfaces.
//!
//! The backend process owns all durable state. These traits describe the calls
//! the core makes into it; the transport and wire format behind them belong to
//! the host. Mutating calls return a [`ServiceReturn`] whose companion updates
//! are applied to the object cache by the caller.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::objects::{
    Client, CloseTabResult, ORef, Point, StarObj, StarObjUpdate, WinSize, Window, Workspace,
    WorkspaceListEntry,
};

/// Errors returned by backend service calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The call reached the backend and failed there.
    #[error("RPC call failed: {0}")]
    Rpc(String),
    /// The backend has no object for the request.
    #[error("not found: {0}")]
    NotFound(String),
    /// The response could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The connection to the backend is gone.
    #[error("backend disconnected")]
    Disconnected,
}

/// Response payload plus the object updates the call produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceReturn<T> {
    pub data: T,
    pub updates: Vec<StarObjUpdate>,
}

impl<T> ServiceReturn<T> {
    #[must_use]
    pub const fn new(data: T) -> Self { Self { data, updates: Vec::new() } }

    #[must_use]
    pub fn with_updates(data: T, updates: Vec<StarObjUpdate>) -> Self { Self { data, updates } }
}

/// Result alias for service calls.
pub type ServiceResult<T> = Result<T, BackendError>;

/// Generic object access.
#[async_trait]
pub trait ObjectService: Send + Sync {
    /// `GetObject`: fetches one object, `None` if it does not exist.
    async fn get_object(&self, oref: &ORef) -> ServiceResult<Option<StarObj>>;

    /// `UpdateObject`: upserts an object.
    async fn update_object(&self, obj: StarObj, allow_create: bool) -> ServiceResult<ServiceReturn<()>>;
}

/// Client-level calls.
#[async_trait]
pub trait ClientService: Send + Sync {
    /// `GetClientData`.
    async fn get_client_data(&self) -> ServiceResult<Client>;

    /// `FocusWindow`: records the focused window.
    async fn focus_window(&self, window_id: &str) -> ServiceResult<ServiceReturn<()>>;
}

/// Window calls.
#[async_trait]
pub trait WindowService: Send + Sync {
    /// `GetWindow`.
    async fn get_window(&self, window_id: &str) -> ServiceResult<Option<Window>>;

    /// `CreateWindow`: creates a window showing `workspace_id`, or a fresh
    /// workspace when the id is empty.
    async fn create_window(
        &self,
        win_size: Option<WinSize>,
        workspace_id: &str,
    ) -> ServiceResult<ServiceReturn<Window>>;

    /// `SetWindowPosAndSize`.
    async fn set_window_pos_and_size(
        &self,
        window_id: &str,
        pos: Option<Point>,
        size: Option<WinSize>,
    ) -> ServiceResult<ServiceReturn<()>>;

    /// `SwitchWorkspace`: returns the workspace now shown, if the switch happened.
    async fn switch_workspace(
        &self,
        window_id: &str,
        workspace_id: &str,
    ) -> ServiceResult<ServiceReturn<Option<Workspace>>>;

    /// `CloseWindow`.
    async fn close_window(&self, window_id: &str, from_shell: bool) -> ServiceResult<ServiceReturn<()>>;
}

/// Workspace and tab calls.
#[async_trait]
pub trait WorkspaceService: Send + Sync {
    /// `CreateWorkspace`: returns the new workspace id.
    async fn create_workspace(
        &self,
        name: &str,
        icon: &str,
        color: &str,
        apply_defaults: bool,
    ) -> ServiceResult<ServiceReturn<String>>;

    /// `GetWorkspace`.
    async fn get_workspace(&self, workspace_id: &str) -> ServiceResult<Option<Workspace>>;

    /// `DeleteWorkspace`: returns the workspace that replaces it, if any.
    async fn delete_workspace(&self, workspace_id: &str) -> ServiceResult<ServiceReturn<Option<String>>>;

    /// `ListWorkspaces`.
    async fn list_workspaces(&self) -> ServiceResult<Vec<WorkspaceListEntry>>;

    /// `CreateTab`: returns the new tab id.
    async fn create_tab(
        &self,
        workspace_id: &str,
        name: Option<&str>,
        activate: bool,
        pinned: bool,
    ) -> ServiceResult<ServiceReturn<String>>;

    /// `SetActiveTab`.
    async fn set_active_tab(&self, workspace_id: &str, tab_id: &str) -> ServiceResult<ServiceReturn<()>>;

    /// `CloseTab`.
    async fn close_tab(
        &self,
        workspace_id: &str,
        tab_id: &str,
        from_shell: bool,
    ) -> ServiceResult<ServiceReturn<CloseTabResult>>;
}

/// The set of backend services the core talks to.
#[derive(Clone)]
pub struct Services {
    pub objects: Arc<dyn ObjectService>,
    pub clients: Arc<dyn ClientService>,
    pub windows: Arc<dyn WindowService>,
    pub workspaces: Arc<dyn WorkspaceService>,
}

impl Services {
    /// Uses one backend object for every service.
    #[must_use]
    pub fn from_backend<B>(backend: &Arc<B>) -> Self
    where
        B: ObjectService + ClientService + WindowService + WorkspaceService + 'static,
    {
        Self {
            objects: backend.clone(),
            clients: backend.clone(),
            windows: backend.clone(),
            workspaces: backend.clone(),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
