//! In-memory backend, transport, views and windows for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::config::StarConfig;
use crate::events::{RpcMessage, RpcTransport};
use crate::objects::{
    Client, CloseTabResult, ORef, ObjectStore, Point, StarObj, StarObjUpdate, StarObject, WinSize, Window,
    Workspace, WorkspaceListEntry,
};
use crate::services::{
    BackendError, ClientService, ObjectService, ServiceResult, ServiceReturn, Services, WindowService,
    WorkspaceService,
};
use crate::tabs::{Bounds, PlatformView, TabView, TabViewPool, ViewFactory, ViewHost, ViewMessage, ViewSignals, ViewStyle};
use crate::windows::{NativeWindow, ShellContext, WindowFactory, WindowOptions};

// ============================================================================
// Backend
// ============================================================================

#[derive(Default)]
struct BackendState {
    objects: HashMap<ORef, StarObj>,
    client: Client,
    windows: HashMap<String, Window>,
    workspaces: HashMap<String, Workspace>,
    next_id: u64,
    calls: Vec<(&'static str, String)>,
    updated: Vec<StarObj>,
    update_allow_create: Vec<bool>,
    failing: HashSet<&'static str>,
    fail_fetches: bool,
    get_object_calls: usize,
}

impl BackendState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", 100 + self.next_id)
    }

    fn new_workspace(&mut self, with_tab: bool) -> String {
        let oid = self.next_id("WS");
        let mut workspace = Workspace { oid: oid.clone(), version: 1, ..Workspace::default() };
        if with_tab {
            let tab_id = self.next_id("T");
            workspace.tabids.push(tab_id.clone());
            workspace.activetabid = tab_id;
        }
        self.workspaces.insert(oid.clone(), workspace);
        oid
    }

    fn workspace_mut(&mut self, workspace_id: &str) -> ServiceResult<&mut Workspace> {
        self.workspaces
            .get_mut(workspace_id)
            .ok_or_else(|| BackendError::NotFound(format!("workspace:{workspace_id}")))
    }

    fn typed_object(&self, oref: &ORef) -> Option<StarObj> {
        match oref.otype() {
            "window" => self.windows.get(oref.oid()).and_then(|w| StarObj::from_typed(w).ok()),
            "workspace" => self.workspaces.get(oref.oid()).and_then(|w| StarObj::from_typed(w).ok()),
            "client" if oref.oid() == self.client.oid => StarObj::from_typed(&self.client).ok(),
            _ => None,
        }
    }
}

fn update_of<T: StarObject>(model: &T) -> Vec<StarObjUpdate> {
    StarObj::from_typed(model).ok().map(StarObjUpdate::update).into_iter().collect()
}

/// Latch that lets held fetches proceed.
pub struct FetchGate {
    tx: watch::Sender<bool>,
}

impl FetchGate {
    pub fn release(&self) { self.tx.send_replace(true); }
}

/// Scripted backend implementing every service trait.
pub struct MockBackend {
    state: Mutex<BackendState>,
    hold: Mutex<Option<watch::Receiver<bool>>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        let state = BackendState {
            client: Client { oid: "C1".into(), version: 1, ..Client::default() },
            ..BackendState::default()
        };
        Arc::new(Self { state: Mutex::new(state), hold: Mutex::new(None) })
    }

    /// Serves `obj` for its own reference.
    pub fn put_object(&self, obj: StarObj) {
        let oref = obj.oref().unwrap();
        self.put_object_as(&oref, obj);
    }

    /// Serves `obj` when `oref` is requested.
    pub fn put_object_as(&self, oref: &ORef, obj: StarObj) {
        self.state.lock().objects.insert(oref.clone(), obj);
    }

    /// Blocks every `GetObject` until the returned gate is released.
    pub fn hold_fetches(&self) -> FetchGate {
        let (tx, rx) = watch::channel(false);
        *self.hold.lock() = Some(rx);
        FetchGate { tx }
    }

    pub fn fail_fetches(&self, fail: bool) { self.state.lock().fail_fetches = fail; }

    /// Makes every call to the named service method fail.
    pub fn fail_call(&self, method: &'static str) { self.state.lock().failing.insert(method); }

    pub fn get_object_calls(&self) -> usize { self.state.lock().get_object_calls }

    /// Objects pushed through `UpdateObject`.
    pub fn updated_objects(&self) -> Vec<StarObj> { self.state.lock().updated.clone() }

    /// The `allow_create` flag of every `UpdateObject` call.
    pub fn update_allow_create(&self) -> Vec<bool> { self.state.lock().update_allow_create.clone() }

    /// Arguments of every call to `method`, in order.
    pub fn calls_to(&self, method: &str) -> Vec<String> {
        self.state.lock().calls.iter().filter(|(name, _)| *name == method).map(|(_, args)| args.clone()).collect()
    }

    /// Adds a workspace whose first tab is active.
    pub fn add_workspace(&self, oid: &str, name: &str, tabs: &[&str]) -> Workspace {
        let workspace = Workspace {
            oid: oid.into(),
            version: 1,
            name: name.into(),
            tabids: tabs.iter().map(ToString::to_string).collect(),
            activetabid: tabs.first().map(ToString::to_string).unwrap_or_default(),
            ..Workspace::default()
        };
        self.state.lock().workspaces.insert(oid.into(), workspace.clone());
        workspace
    }

    /// Adds a window owned by the client.
    pub fn add_window(&self, oid: &str, workspace_id: &str) -> Window {
        let window = Window {
            oid: oid.into(),
            version: 1,
            workspaceid: workspace_id.into(),
            pos: Point { x: 10, y: 20 },
            winsize: WinSize { width: 1000, height: 700 },
            ..Window::default()
        };
        let mut state = self.state.lock();
        state.windows.insert(oid.into(), window.clone());
        state.client.windowids.push(oid.into());
        window
    }

    pub fn workspace(&self, oid: &str) -> Option<Workspace> { self.state.lock().workspaces.get(oid).cloned() }

    pub fn window(&self, oid: &str) -> Option<Window> { self.state.lock().windows.get(oid).cloned() }

    pub fn client(&self) -> Client { self.state.lock().client.clone() }

    fn begin(&self, method: &'static str, args: String) -> ServiceResult<()> {
        let mut state = self.state.lock();
        state.calls.push((method, args));
        if state.failing.contains(method) {
            return Err(BackendError::Rpc(format!("{method} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectService for MockBackend {
    async fn get_object(&self, oref: &ORef) -> ServiceResult<Option<StarObj>> {
        self.state.lock().get_object_calls += 1;
        self.begin("GetObject", oref.to_string())?;
        let hold = self.hold.lock().clone();
        if let Some(mut rx) = hold {
            let _ = rx.wait_for(|open| *open).await;
        }

        let state = self.state.lock();
        if state.fail_fetches {
            return Err(BackendError::Rpc("fetch failed".into()));
        }
        Ok(state.objects.get(oref).cloned().or_else(|| state.typed_object(oref)))
    }

    async fn update_object(&self, obj: StarObj, allow_create: bool) -> ServiceResult<ServiceReturn<()>> {
        self.begin("UpdateObject", format!("{}:{}", obj.otype, obj.oid))?;
        let mut state = self.state.lock();
        state.update_allow_create.push(allow_create);
        if let Ok(oref) = obj.oref() {
            state.objects.insert(oref, obj.clone());
        }
        state.updated.push(obj);
        Ok(ServiceReturn::new(()))
    }
}

#[async_trait]
impl ClientService for MockBackend {
    async fn get_client_data(&self) -> ServiceResult<Client> {
        self.begin("GetClientData", String::new())?;
        Ok(self.state.lock().client.clone())
    }

    async fn focus_window(&self, window_id: &str) -> ServiceResult<ServiceReturn<()>> {
        self.begin("FocusWindow", window_id.to_string())?;
        Ok(ServiceReturn::new(()))
    }
}

#[async_trait]
impl WindowService for MockBackend {
    async fn get_window(&self, window_id: &str) -> ServiceResult<Option<Window>> {
        self.begin("GetWindow", window_id.to_string())?;
        Ok(self.state.lock().windows.get(window_id).cloned())
    }

    async fn create_window(
        &self,
        win_size: Option<WinSize>,
        workspace_id: &str,
    ) -> ServiceResult<ServiceReturn<Window>> {
        self.begin("CreateWindow", workspace_id.to_string())?;
        let mut state = self.state.lock();
        let workspace_id = if workspace_id.is_empty() {
            state.new_workspace(true)
        } else if state.workspaces.contains_key(workspace_id) {
            workspace_id.to_string()
        } else {
            return Err(BackendError::NotFound(format!("workspace:{workspace_id}")));
        };
        let oid = state.next_id("W");
        let window = Window {
            oid: oid.clone(),
            version: 1,
            workspaceid: workspace_id,
            winsize: win_size.unwrap_or_default(),
            ..Window::default()
        };
        state.windows.insert(oid.clone(), window.clone());
        state.client.windowids.push(oid);
        let updates = update_of(&window);
        Ok(ServiceReturn::with_updates(window, updates))
    }

    async fn set_window_pos_and_size(
        &self,
        window_id: &str,
        pos: Option<Point>,
        size: Option<WinSize>,
    ) -> ServiceResult<ServiceReturn<()>> {
        let pos = pos.unwrap_or_default();
        let size = size.unwrap_or_default();
        self.begin(
            "SetWindowPosAndSize",
            format!("{window_id} {},{} {}x{}", pos.x, pos.y, size.width, size.height),
        )?;
        if let Some(window) = self.state.lock().windows.get_mut(window_id) {
            window.pos = pos;
            window.winsize = size;
            window.version += 1;
        }
        Ok(ServiceReturn::new(()))
    }

    async fn switch_workspace(
        &self,
        window_id: &str,
        workspace_id: &str,
    ) -> ServiceResult<ServiceReturn<Option<Workspace>>> {
        self.begin("SwitchWorkspace", format!("{window_id}/{workspace_id}"))?;
        let mut state = self.state.lock();
        let Some(workspace) = state.workspaces.get(workspace_id).cloned() else {
            return Ok(ServiceReturn::new(None));
        };
        let window = state
            .windows
            .get_mut(window_id)
            .ok_or_else(|| BackendError::NotFound(format!("window:{window_id}")))?;
        window.workspaceid = workspace_id.to_string();
        window.version += 1;
        let updates = update_of(&*window);
        Ok(ServiceReturn::with_updates(Some(workspace), updates))
    }

    async fn close_window(&self, window_id: &str, _from_shell: bool) -> ServiceResult<ServiceReturn<()>> {
        self.begin("CloseWindow", window_id.to_string())?;
        let mut state = self.state.lock();
        state.windows.remove(window_id);
        state.client.windowids.retain(|id| id != window_id);
        Ok(ServiceReturn::new(()))
    }
}

#[async_trait]
impl WorkspaceService for MockBackend {
    async fn create_workspace(
        &self,
        name: &str,
        _icon: &str,
        _color: &str,
        apply_defaults: bool,
    ) -> ServiceResult<ServiceReturn<String>> {
        self.begin("CreateWorkspace", name.to_string())?;
        let mut state = self.state.lock();
        let oid = state.new_workspace(apply_defaults);
        if let Some(workspace) = state.workspaces.get_mut(&oid) {
            workspace.name = name.to_string();
        }
        Ok(ServiceReturn::new(oid))
    }

    async fn get_workspace(&self, workspace_id: &str) -> ServiceResult<Option<Workspace>> {
        self.begin("GetWorkspace", workspace_id.to_string())?;
        Ok(self.state.lock().workspaces.get(workspace_id).cloned())
    }

    async fn delete_workspace(&self, workspace_id: &str) -> ServiceResult<ServiceReturn<Option<String>>> {
        self.begin("DeleteWorkspace", workspace_id.to_string())?;
        let mut state = self.state.lock();
        state.workspaces.remove(workspace_id);
        let shown: HashSet<&str> = state.windows.values().map(|w| w.workspaceid.as_str()).collect();
        let mut free: Vec<&String> = state.workspaces.keys().filter(|id| !shown.contains(id.as_str())).collect();
        free.sort();
        Ok(ServiceReturn::new(free.first().map(|id| (*id).clone())))
    }

    async fn list_workspaces(&self) -> ServiceResult<Vec<WorkspaceListEntry>> {
        self.begin("ListWorkspaces", String::new())?;
        let state = self.state.lock();
        let mut entries: Vec<WorkspaceListEntry> = state
            .workspaces
            .keys()
            .map(|id| WorkspaceListEntry {
                workspaceid: id.clone(),
                windowid: state.windows.values().find(|w| &w.workspaceid == id).map(|w| w.oid.clone()),
            })
            .collect();
        entries.sort_by(|a, b| a.workspaceid.cmp(&b.workspaceid));
        Ok(entries)
    }

    async fn create_tab(
        &self,
        workspace_id: &str,
        _name: Option<&str>,
        activate: bool,
        pinned: bool,
    ) -> ServiceResult<ServiceReturn<String>> {
        self.begin("CreateTab", workspace_id.to_string())?;
        let mut state = self.state.lock();
        let tab_id = state.next_id("T");
        let workspace = state.workspace_mut(workspace_id)?;
        if pinned {
            workspace.pinnedtabids.push(tab_id.clone());
        } else {
            workspace.tabids.push(tab_id.clone());
        }
        if activate {
            workspace.activetabid.clone_from(&tab_id);
        }
        workspace.version += 1;
        let updates = update_of(&*workspace);
        Ok(ServiceReturn::with_updates(tab_id, updates))
    }

    async fn set_active_tab(&self, workspace_id: &str, tab_id: &str) -> ServiceResult<ServiceReturn<()>> {
        self.begin("SetActiveTab", format!("{workspace_id}/{tab_id}"))?;
        let mut state = self.state.lock();
        let workspace = state.workspace_mut(workspace_id)?;
        workspace.activetabid = tab_id.to_string();
        workspace.version += 1;
        let updates = update_of(&*workspace);
        Ok(ServiceReturn::with_updates((), updates))
    }

    async fn close_tab(
        &self,
        workspace_id: &str,
        tab_id: &str,
        _from_shell: bool,
    ) -> ServiceResult<ServiceReturn<CloseTabResult>> {
        self.begin("CloseTab", format!("{workspace_id}/{tab_id}"))?;
        let mut state = self.state.lock();
        let workspace = state.workspace_mut(workspace_id)?;
        workspace.tabids.retain(|id| id != tab_id);
        workspace.pinnedtabids.retain(|id| id != tab_id);
        workspace.version += 1;

        let remaining = workspace.pinnedtabids.iter().chain(workspace.tabids.iter()).last().cloned();
        let mut result = CloseTabResult::default();
        match remaining {
            None => {
                workspace.activetabid.clear();
                result.close_window = true;
            }
            Some(next) if workspace.activetabid == tab_id => {
                workspace.activetabid.clone_from(&next);
                result.new_active_tab_id = Some(next);
            }
            Some(_) => {}
        }
        let updates = update_of(&*workspace);
        Ok(ServiceReturn::with_updates(result, updates))
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Records every control message.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<RpcMessage>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn sent(&self) -> Vec<RpcMessage> { self.sent.lock().clone() }

    pub fn last(&self) -> Option<RpcMessage> { self.sent.lock().last().cloned() }

    /// Returns and forgets everything sent so far.
    pub fn take(&self) -> Vec<RpcMessage> { std::mem::take(&mut *self.sent.lock()) }
}

impl RpcTransport for RecordingTransport {
    fn send_rpc_message(&self, message: RpcMessage) { self.sent.lock().push(message); }
}

// ============================================================================
// Views
// ============================================================================

/// A platform view that records what it was asked to do.
pub struct FakeView {
    id: u64,
    bounds: Mutex<Bounds>,
    sent: Mutex<Vec<ViewMessage>>,
    focused: AtomicBool,
    set_bounds_calls: AtomicUsize,
    focus_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl FakeView {
    fn new(id: u64) -> Self {
        Self {
            id,
            bounds: Mutex::new(Bounds::default()),
            sent: Mutex::new(Vec::new()),
            focused: AtomicBool::new(false),
            set_bounds_calls: AtomicUsize::new(0),
            focus_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<ViewMessage> { self.sent.lock().clone() }

    pub fn set_bounds_calls(&self) -> usize { self.set_bounds_calls.load(Ordering::SeqCst) }

    pub fn focus_calls(&self) -> usize { self.focus_calls.load(Ordering::SeqCst) }

    pub fn close_calls(&self) -> usize { self.close_calls.load(Ordering::SeqCst) }

    /// Simulates the view losing focus to something else.
    pub fn blur(&self) { self.focused.store(false, Ordering::SeqCst); }
}

impl PlatformView for FakeView {
    fn id(&self) -> u64 { self.id }

    fn bounds(&self) -> Bounds { *self.bounds.lock() }

    fn set_bounds(&self, bounds: Bounds) {
        self.set_bounds_calls.fetch_add(1, Ordering::SeqCst);
        *self.bounds.lock() = bounds;
    }

    fn send(&self, message: ViewMessage) { self.sent.lock().push(message); }

    fn focus(&self) {
        self.focus_calls.fetch_add(1, Ordering::SeqCst);
        self.focused.store(true, Ordering::SeqCst);
    }

    fn is_focused(&self) -> bool { self.focused.load(Ordering::SeqCst) }

    fn close(&self) { self.close_calls.fetch_add(1, Ordering::SeqCst); }
}

/// Creates [`FakeView`]s. In automatic mode every view reports itself
/// initialized and ready right away; in manual mode the test drives the
/// signals.
pub struct FakeViewFactory {
    auto_ready: bool,
    next_id: AtomicU64,
    views: Mutex<Vec<Arc<FakeView>>>,
    signals: Mutex<HashMap<u64, ViewSignals>>,
    handlers_registered: AtomicUsize,
}

impl FakeViewFactory {
    pub fn new() -> Arc<Self> { Arc::new(Self::with_mode(true)) }

    pub fn manual() -> Arc<Self> { Arc::new(Self::with_mode(false)) }

    fn with_mode(auto_ready: bool) -> Self {
        Self {
            auto_ready,
            next_id: AtomicU64::new(1),
            views: Mutex::new(Vec::new()),
            signals: Mutex::new(HashMap::new()),
            handlers_registered: AtomicUsize::new(0),
        }
    }

    pub fn view(&self, id: u64) -> Option<Arc<FakeView>> {
        self.views.lock().iter().find(|v| v.id == id).cloned()
    }

    pub fn signals(&self, id: u64) -> Option<ViewSignals> { self.signals.lock().get(&id).cloned() }

    /// Drops the renderer side of view `id`; pending init and ready waits fail.
    pub fn crash(&self, id: u64) { self.signals.lock().remove(&id); }

    pub fn created(&self) -> usize { self.views.lock().len() }

    pub fn last_view_id(&self) -> Option<u64> { self.views.lock().last().map(|v| v.id) }

    pub fn handlers_registered(&self) -> usize { self.handlers_registered.load(Ordering::SeqCst) }

    pub fn total_close_calls(&self) -> usize { self.views.lock().iter().map(|v| v.close_calls()).sum() }
}

impl ViewFactory for FakeViewFactory {
    fn create_view(&self, _style: &ViewStyle, signals: ViewSignals) -> Arc<dyn PlatformView> {
        let view = Arc::new(FakeView::new(self.next_id.fetch_add(1, Ordering::SeqCst)));
        if self.auto_ready {
            signals.mark_initialized();
            signals.mark_ready();
        }
        self.signals.lock().insert(view.id, signals);
        self.views.lock().push(Arc::clone(&view));
        view
    }

    fn register_handlers(&self, _view: &Arc<TabView>) { self.handlers_registered.fetch_add(1, Ordering::SeqCst); }
}

/// A [`ViewHost`] that destroys whatever the pool asks it to remove.
#[derive(Default)]
pub struct RecordingHost {
    pool: Mutex<Option<TabViewPool>>,
    removed: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn set_pool(&self, pool: &TabViewPool) { *self.pool.lock() = Some(pool.clone()); }

    pub fn removed(&self) -> Vec<String> { self.removed.lock().clone() }
}

impl ViewHost for RecordingHost {
    fn remove_tab_view(&self, tab_id: &str, _force: bool) -> bool {
        self.removed.lock().push(tab_id.to_string());
        let pool = self.pool.lock().clone();
        if let Some(pool) = pool {
            if let Some(view) = pool.get(tab_id) {
                pool.destroy(&view);
            }
        }
        true
    }
}

// ============================================================================
// Windows
// ============================================================================

/// A native window that only records calls.
pub struct FakeNativeWindow {
    bounds: Mutex<Bounds>,
    children: Mutex<Vec<u64>>,
    destroyed: AtomicBool,
    fullscreen: AtomicBool,
    shown: AtomicBool,
    close_calls: AtomicUsize,
    focus_calls: AtomicUsize,
}

impl FakeNativeWindow {
    pub fn new(bounds: Bounds) -> Arc<Self> {
        Arc::new(Self {
            bounds: Mutex::new(bounds),
            children: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
            fullscreen: AtomicBool::new(false),
            shown: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            focus_calls: AtomicUsize::new(0),
        })
    }

    /// Moves or resizes the window as the user would.
    pub fn set_bounds(&self, bounds: Bounds) { *self.bounds.lock() = bounds; }

    pub fn set_fullscreen(&self, fullscreen: bool) { self.fullscreen.store(fullscreen, Ordering::SeqCst); }

    /// View ids of the attached child views.
    pub fn children(&self) -> Vec<u64> { self.children.lock().clone() }

    pub fn is_shown(&self) -> bool { self.shown.load(Ordering::SeqCst) }

    pub fn close_calls(&self) -> usize { self.close_calls.load(Ordering::SeqCst) }

    pub fn focus_calls(&self) -> usize { self.focus_calls.load(Ordering::SeqCst) }
}

impl NativeWindow for FakeNativeWindow {
    fn content_bounds(&self) -> Bounds { self.bounds.lock().at_origin() }

    fn bounds(&self) -> Bounds { *self.bounds.lock() }

    fn is_destroyed(&self) -> bool { self.destroyed.load(Ordering::SeqCst) }

    fn is_fullscreen(&self) -> bool { self.fullscreen.load(Ordering::SeqCst) }

    fn add_child_view(&self, view: &Arc<dyn PlatformView>) {
        let mut children = self.children.lock();
        if !children.contains(&view.id()) {
            children.push(view.id());
        }
    }

    fn remove_child_view(&self, view: &Arc<dyn PlatformView>) {
        self.children.lock().retain(|id| *id != view.id());
    }

    fn show(&self) { self.shown.store(true, Ordering::SeqCst); }

    fn focus(&self) { self.focus_calls.fetch_add(1, Ordering::SeqCst); }

    fn close(&self) { self.close_calls.fetch_add(1, Ordering::SeqCst); }

    fn destroy(&self) { self.destroyed.store(true, Ordering::SeqCst); }
}

/// Creates [`FakeNativeWindow`]s and remembers the options they were built with.
pub struct FakeWindowFactory {
    work_area: WinSize,
    created: Mutex<Vec<(WindowOptions, Arc<FakeNativeWindow>)>>,
}

impl FakeWindowFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { work_area: WinSize { width: 1920, height: 1080 }, created: Mutex::new(Vec::new()) })
    }

    pub fn created(&self) -> usize { self.created.lock().len() }

    pub fn window(&self, window_id: &str) -> Option<Arc<FakeNativeWindow>> {
        self.created.lock().iter().rev().find(|(o, _)| o.window_id == window_id).map(|(_, w)| Arc::clone(w))
    }

    pub fn options(&self, window_id: &str) -> Option<WindowOptions> {
        self.created.lock().iter().rev().find(|(o, _)| o.window_id == window_id).map(|(o, _)| o.clone())
    }
}

impl WindowFactory for FakeWindowFactory {
    fn create_window(&self, options: &WindowOptions) -> Arc<dyn NativeWindow> {
        let window = FakeNativeWindow::new(options.bounds);
        self.created.lock().push((options.clone(), Arc::clone(&window)));
        window
    }

    fn primary_work_area(&self) -> WinSize { self.work_area }
}

/// A [`ShellContext`] over `backend` and `views`.
pub fn shell_context(backend: &Arc<MockBackend>, views: &Arc<FakeViewFactory>, config: StarConfig) -> Arc<ShellContext> {
    let services = Services::from_backend(backend);
    let store = ObjectStore::new(Arc::clone(&services.objects), &config.object_store);
    let style = ViewStyle { background_color: config.window.background_color().to_string() };
    let pool = TabViewPool::new(views.clone(), &config.tab_cache, style);
    Arc::new(ShellContext::new(services, store, pool, Arc::new(config)))
}
