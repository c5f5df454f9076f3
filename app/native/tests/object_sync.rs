//! Object cache and event router working together through the public API.
//!
//! ```bash
//! cargo test -p starshell --test object_sync
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use starshell_lib::config::ObjectStoreConfig;
use starshell_lib::constants::EVENT_OBJECT_UPDATE;
use starshell_lib::events::{EventRouter, RpcMessage, RpcTransport, StarEvent};
use starshell_lib::objects::{ORef, ObjectStore, StarObj, StarObjUpdate};
use starshell_lib::services::{ObjectService, ServiceResult, ServiceReturn};

// ============================================================================
// Test Doubles
// ============================================================================

#[derive(Default)]
struct Backend {
    objects: Mutex<HashMap<ORef, StarObj>>,
    fetches: AtomicUsize,
}

#[async_trait]
impl ObjectService for Backend {
    async fn get_object(&self, oref: &ORef) -> ServiceResult<Option<StarObj>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.lock().get(oref).cloned())
    }

    async fn update_object(&self, obj: StarObj, _allow_create: bool) -> ServiceResult<ServiceReturn<()>> {
        if let Ok(oref) = obj.oref() {
            self.objects.lock().insert(oref, obj);
        }
        Ok(ServiceReturn::new(()))
    }
}

#[derive(Default)]
struct Transport {
    sent: Mutex<Vec<RpcMessage>>,
}

impl RpcTransport for Transport {
    fn send_rpc_message(&self, message: RpcMessage) { self.sent.lock().push(message); }
}

// ============================================================================
// Helpers
// ============================================================================

fn tab(version: i64, name: &str) -> StarObj { StarObj::new("tab", "T1", version).with_field("name", name) }

fn push(obj: StarObj) -> StarEvent {
    let data = serde_json::to_value(StarObjUpdate::update(obj)).expect("update serializes");
    StarEvent::new(EVENT_OBJECT_UPDATE).with_scopes(["tab:T1"]).with_data(data)
}

struct Fixture {
    backend: Arc<Backend>,
    transport: Arc<Transport>,
    router: EventRouter,
    store: ObjectStore,
}

fn fixture() -> Fixture {
    let backend = Arc::new(Backend::default());
    backend.objects.lock().insert(ORef::new("tab", "T1").unwrap(), tab(1, "foo"));
    let transport = Arc::new(Transport::default());
    let router = EventRouter::new(transport.clone());
    let store = ObjectStore::new(backend.clone(), &ObjectStoreConfig::default());
    Fixture { backend, transport, router, store }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_load_then_follow_pushed_updates() {
    let f = fixture();
    let oref: ORef = "tab:T1".parse().unwrap();
    let _updates = f.store.subscribe_to_object(&f.router, &oref);

    let loaded = f.store.load(&oref).await.unwrap().unwrap();
    assert_eq!(loaded.str_field("name"), Some("foo"));

    let entry = f.store.get(&oref, false).unwrap();
    let data = entry.data();
    assert!(!data.loading);
    assert_eq!(data.value.as_ref().and_then(|v| v.str_field("name")), Some("foo"));

    assert_eq!(f.router.dispatch(&push(tab(1, "ignored"))), 1);
    assert_eq!(f.store.value_of(&oref).unwrap().str_field("name"), Some("foo"));

    f.router.dispatch(&push(tab(2, "bar")));
    let value = f.store.value_of(&oref).unwrap();
    assert_eq!(value.version, 2);
    assert_eq!(value.str_field("name"), Some("bar"));

    assert_eq!(f.backend.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_object_subscription_is_announced_and_withdrawn() {
    let f = fixture();
    let oref: ORef = "tab:T1".parse().unwrap();

    let updates = f.store.subscribe_to_object(&f.router, &oref);
    let subscribed = f.transport.sent.lock().last().cloned();
    match subscribed {
        Some(RpcMessage::EventSub(req)) => {
            assert_eq!(req.event, EVENT_OBJECT_UPDATE);
            assert_eq!(req.scopes, vec!["tab:T1".to_string()]);
            assert!(!req.allscopes);
        }
        other => panic!("expected eventsub, got {other:?}"),
    }

    updates.unsubscribe();
    assert_eq!(
        f.transport.sent.lock().last().cloned(),
        Some(RpcMessage::EventUnsub(EVENT_OBJECT_UPDATE.to_string()))
    );
    assert_eq!(f.router.dispatch(&push(tab(5, "late"))), 0);
}

#[tokio::test]
async fn test_update_for_other_scope_is_not_routed() {
    let f = fixture();
    let oref: ORef = "tab:T1".parse().unwrap();
    let _updates = f.store.subscribe_to_object(&f.router, &oref);
    f.store.load(&oref).await.unwrap();

    let other = StarEvent::new(EVENT_OBJECT_UPDATE)
        .with_scopes(["tab:T2"])
        .with_data(serde_json::to_value(StarObjUpdate::update(StarObj::new("tab", "T2", 3))).unwrap());
    assert_eq!(f.router.dispatch(&other), 0);
    assert!(!f.store.contains(&ORef::new("tab", "T2").unwrap()));
}

#[tokio::test]
async fn test_local_write_reaches_backend() {
    let f = fixture();
    let oref: ORef = "tab:T1".parse().unwrap();
    f.store.load(&oref).await.unwrap();

    assert!(f.store.set_value(tab(4, "local"), true));
    assert_eq!(f.store.value_of(&oref).unwrap().str_field("name"), Some("local"));

    tokio::time::sleep(Duration::from_millis(5)).await;
    let stored = f.backend.objects.lock().get(&oref).cloned().unwrap();
    assert_eq!(stored.str_field("name"), Some("local"));
}
