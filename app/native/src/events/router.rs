//! Local event handler registry kept in sync with the backend's subscription set.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use super::types::{RpcMessage, RpcTransport, StarEvent, SubscriptionRequest};
use crate::utils::panic_message;

/// Callback invoked for each matching event.
pub type EventHandler = Arc<dyn Fn(&StarEvent) + Send + Sync>;

/// One handler registration request.
#[derive(Clone)]
pub struct Subscription {
    event: String,
    scope: Option<String>,
    handler: EventHandler,
}

impl Subscription {
    /// Receives every event of type `event`.
    pub fn new<F>(event: impl Into<String>, handler: F) -> Self
    where F: Fn(&StarEvent) + Send + Sync + 'static {
        Self { event: event.into(), scope: None, handler: Arc::new(handler) }
    }

    /// Receives events of type `event` whose scopes contain `scope`.
    ///
    /// A blank scope behaves like [`Subscription::new`].
    pub fn scoped<F>(event: impl Into<String>, scope: impl Into<String>, handler: F) -> Self
    where F: Fn(&StarEvent) + Send + Sync + 'static {
        let scope = scope.into();
        let scope = (!scope.trim().is_empty()).then_some(scope);
        Self { event: event.into(), scope, handler: Arc::new(handler) }
    }

    #[must_use]
    pub fn event(&self) -> &str { &self.event }

    #[must_use]
    pub fn scope(&self) -> Option<&str> { self.scope.as_deref() }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

struct Registered {
    id: Uuid,
    scope: Option<String>,
    handler: EventHandler,
}

struct RouterInner {
    handlers: Mutex<HashMap<String, Vec<Registered>>>,
    transport: Arc<dyn RpcTransport>,
}

/// Dispatches pushed events to registered handlers.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl EventRouter {
    #[must_use]
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            inner: Arc::new(RouterInner { handlers: Mutex::new(HashMap::new()), transport }),
        }
    }

    /// Registers a batch of handlers.
    ///
    /// The backend subscription of every affected event type is recomputed
    /// and re-sent. The returned handle removes the whole batch.
    #[must_use = "dropping the handle keeps the handlers registered forever"]
    pub fn subscribe(&self, subscriptions: Vec<Subscription>) -> EventSubscription {
        let mut ids = Vec::with_capacity(subscriptions.len());
        let mut affected: Vec<String> = Vec::new();

        let messages = {
            let mut handlers = self.inner.handlers.lock();
            for sub in subscriptions {
                let id = Uuid::now_v7();
                ids.push(id);
                if !affected.contains(&sub.event) {
                    affected.push(sub.event.clone());
                }
                handlers.entry(sub.event).or_default().push(Registered {
                    id,
                    scope: sub.scope,
                    handler: sub.handler,
                });
            }
            affected.iter().map(|event| resub_message(&handlers, event)).collect::<Vec<_>>()
        };

        self.send_all(messages);
        EventSubscription { router: Arc::downgrade(&self.inner), ids }
    }

    /// Removes registrations by id. Unknown ids are skipped.
    pub fn unsubscribe(&self, ids: &[Uuid]) { Self::unsubscribe_inner(&self.inner, ids); }

    fn unsubscribe_inner(inner: &RouterInner, ids: &[Uuid]) {
        let messages = {
            let mut handlers = inner.handlers.lock();
            let mut affected: Vec<String> = Vec::new();
            for (event, registered) in handlers.iter_mut() {
                let before = registered.len();
                registered.retain(|r| !ids.contains(&r.id));
                if registered.len() != before {
                    affected.push(event.clone());
                }
            }
            let messages: Vec<_> =
                affected.iter().map(|event| resub_message(&handlers, event)).collect();
            handlers.retain(|_, registered| !registered.is_empty());
            messages
        };

        for message in messages {
            tracing::trace!(event = message.event(), "events: subscription changed");
            inner.transport.send_rpc_message(message);
        }
    }

    /// Delivers `event` to every matching handler and returns how many ran.
    ///
    /// A panicking handler is logged and does not stop delivery to the rest.
    pub fn dispatch(&self, event: &StarEvent) -> usize {
        let matching: Vec<EventHandler> = {
            let handlers = self.inner.handlers.lock();
            let Some(registered) = handlers.get(&event.event) else {
                return 0;
            };
            registered
                .iter()
                .filter(|r| r.scope.as_deref().is_none_or(|scope| event.has_scope(scope)))
                .map(|r| Arc::clone(&r.handler))
                .collect()
        };

        let mut delivered = 0;
        for handler in matching {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        event = %event.event,
                        "events: PANIC in handler: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivered
    }

    /// Re-sends the subscription of every registered event type.
    ///
    /// The backend forgets subscriptions when the connection drops.
    pub fn on_reconnect(&self) {
        let messages: Vec<_> = {
            let handlers = self.inner.handlers.lock();
            let mut events: Vec<&String> = handlers.keys().collect();
            events.sort();
            events.into_iter().map(|event| resub_message(&handlers, event)).collect()
        };
        tracing::debug!(count = messages.len(), "events: resubscribing after reconnect");
        self.send_all(messages);
    }

    /// Number of live registrations for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner.handlers.lock().get(event).map_or(0, Vec::len)
    }

    /// Drops every registration without notifying the backend.
    pub fn clear(&self) { self.inner.handlers.lock().clear(); }

    fn send_all(&self, messages: Vec<RpcMessage>) {
        for message in messages {
            tracing::trace!(event = message.event(), "events: subscription changed");
            self.inner.transport.send_rpc_message(message);
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.inner.handlers.lock();
        f.debug_struct("EventRouter").field("event_types", &handlers.len()).finish_non_exhaustive()
    }
}

/// Computes the control message that makes the backend match local demand for `event`.
fn resub_message(handlers: &HashMap<String, Vec<Registered>>, event: &str) -> RpcMessage {
    let Some(registered) = handlers.get(event).filter(|r| !r.is_empty()) else {
        return RpcMessage::EventUnsub(event.to_string());
    };

    if registered.iter().any(|r| r.scope.is_none()) {
        return RpcMessage::EventSub(SubscriptionRequest {
            event: event.to_string(),
            scopes: Vec::new(),
            allscopes: true,
        });
    }

    let mut scopes: Vec<String> = Vec::new();
    for scope in registered.iter().filter_map(|r| r.scope.as_ref()) {
        if !scopes.contains(scope) {
            scopes.push(scope.clone());
        }
    }
    RpcMessage::EventSub(SubscriptionRequest { event: event.to_string(), scopes, allscopes: false })
}

/// Handle for a batch of registrations made by [`EventRouter::subscribe`].
#[derive(Debug)]
pub struct EventSubscription {
    router: Weak<RouterInner>,
    ids: Vec<Uuid>,
}

impl EventSubscription {
    #[must_use]
    pub fn ids(&self) -> &[Uuid] { &self.ids }

    /// Removes every registration of the batch.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.router.upgrade() {
            EventRouter::unsubscribe_inner(&inner, &self.ids);
        }
    }
}
