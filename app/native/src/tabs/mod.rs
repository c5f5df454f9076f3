//! Tab views and the pool that recycles them.

mod pool;
mod view;

pub use pool::{TabViewPool, ViewHost};
pub use view::{Bounds, InitOpts, PlatformView, TabView, ViewFactory, ViewMessage, ViewSignals, ViewStyle};
