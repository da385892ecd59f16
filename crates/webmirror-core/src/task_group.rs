//! Counted group of spawned tasks with a completion barrier.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    idle: Notify,
}

/// Tracks every task spawned through it. [`wait`](Self::wait) returns once
/// the count drops to zero, including tasks spawned by tasks in the group.
#[derive(Debug, Clone, Default)]
pub struct TaskGroup {
    inner: Arc<Inner>,
}

struct PendingGuard(Arc<Inner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        // Counted before the task exists so a concurrent `wait` cannot miss it.
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let _guard = guard;
            future.await
        })
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
