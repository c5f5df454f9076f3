//! Pushed events and the router that fans them out.

mod router;
mod types;

pub use router::{EventHandler, EventRouter, EventSubscription, Subscription};
pub use types::{RpcMessage, RpcTransport, StarEvent, SubscriptionRequest};
