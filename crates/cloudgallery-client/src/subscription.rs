//! Scoped ownership of background tasks.
//!
//! Timers, socket readers, and input listeners are held as [`Subscription`]s
//! by the view that started them. Dropping the view drops the subscription,
//! which aborts the task.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::trace;

/// Handle to a spawned task that is aborted on drop.
#[derive(Debug)]
pub struct Subscription {
    label: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn `task` on the current runtime and own it.
    #[must_use]
    pub fn spawn<F>(label: &'static str, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::from_handle(label, tokio::spawn(task))
    }

    /// Take ownership of an already spawned task.
    #[must_use]
    pub const fn from_handle(label: &'static str, handle: JoinHandle<()>) -> Self {
        Self {
            label,
            handle: Some(handle),
        }
    }

    /// Task label used in traces.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Whether the task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort the task; later calls do nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            trace!(label = self.label, "subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn drop_stops_the_task() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let subscription = Subscription::spawn("ticker", async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(subscription.is_active());
        drop(subscription);
        let seen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let mut subscription = Subscription::spawn("idle", std::future::pending());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        assert_eq!(subscription.label(), "idle");
    }
}
