//! Trailing-edge debouncer for async work.
//!
//! Each [`Debouncer::call`] re-arms the timer. Only the task passed to the
//! last call made before the delay elapses runs.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::spawn_detached;

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self { Self { delay, generation: Arc::new(AtomicU64::new(0)) } }

    #[must_use]
    pub const fn delay(&self) -> Duration { self.delay }

    /// Schedules `task` after the delay, replacing any task still waiting.
    pub fn call<F>(&self, name: &'static str, task: F)
    where F: Future<Output = ()> + Send + 'static {
        let armed = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;

        spawn_detached(name, async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::Acquire) == armed {
                task.await;
            }
        });
    }

    /// Drops the waiting task, if any.
    pub fn cancel(&self) { self.generation.fetch_add(1, Ordering::AcqRel); }
}

impl Drop for Debouncer {
    fn drop(&mut self) { self.cancel(); }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> std::pin::Pin<Box<dyn Future<Output = ()> + Send>>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        let make = move || {
            let handle = Arc::clone(&handle);
            Box::pin(async move {
                handle.fetch_add(1, Ordering::SeqCst);
            }) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_calls_collapse() {
        let (count, make) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(400));

        for _ in 0..5 {
            debouncer.call("test", make());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_run() {
        let (count, make) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(400));

        debouncer.call("test", make());
        tokio::time::sleep(Duration::from_millis(500)).await;
        debouncer.call("test", make());
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop() {
        let (count, make) = counter();
        let debouncer = Debouncer::new(Duration::from_millis(400));

        debouncer.call("test", make());
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        debouncer.call("test", make());
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
