//! Windows, their action queues and the manager that tracks them.

mod bounds;
mod context;
mod manager;
mod queue;
mod window;

pub use bounds::{MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH, initial_bounds, parse_dimensions};
pub use context::ShellContext;
pub use manager::{WindowBackground, WindowFactory, WindowManager, WindowOptions};
pub use queue::{ActionQueue, WindowAction};
pub use window::{NativeWindow, StarWindow, WindowError};
