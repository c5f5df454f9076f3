//! Wire types for pushed events and subscription control.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event pushed by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarEvent {
    pub event: String,
    /// Routing scopes, usually object references.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl StarEvent {
    #[must_use]
    pub fn new(event: impl Into<String>) -> Self { Self { event: event.into(), ..Self::default() } }

    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool { self.scopes.iter().any(|s| s == scope) }

    /// Deserializes the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is missing or has the wrong shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.data.as_ref().unwrap_or(&Value::Null))
    }
}

/// Body of an `eventsub` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub event: String,
    pub scopes: Vec<String>,
    pub allscopes: bool,
}

/// Subscription control messages sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "lowercase")]
pub enum RpcMessage {
    EventSub(SubscriptionRequest),
    EventUnsub(String),
}

impl RpcMessage {
    /// The event type this message is about.
    #[must_use]
    pub fn event(&self) -> &str {
        match self {
            Self::EventSub(req) => &req.event,
            Self::EventUnsub(event) => event,
        }
    }
}

/// Outbound half of the backend connection.
pub trait RpcTransport: Send + Sync {
    fn send_rpc_message(&self, message: RpcMessage);
}
