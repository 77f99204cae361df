//! Fire-and-forget work that outlives the response it was spawned for.
//!
//! Cache writes and revalidations run here so that delivering a response never
//! waits on them. The host calls [`Background::settle`] when it needs the
//! store to reflect every write issued so far.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;

#[derive(Clone, Default)]
pub struct Background {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Background {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task on the current runtime, reaping any that already finished.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::warn!("background task failed: {e}");
            }
        }
        tasks.spawn(task);
    }

    /// Tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait until every task spawned so far, and any they spawn, has finished.
    pub async fn settle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(done) = tasks.join_next().await {
                if let Err(e) = done {
                    tracing::warn!("background task failed: {e}");
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settle_waits_for_all_tasks() {
        let background = Background::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = Arc::clone(&done);
            background.spawn(async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        background.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(background.pending(), 0);
    }

    #[tokio::test]
    async fn test_settle_follows_nested_spawns() {
        let background = Background::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner = background.clone();
        let counter = Arc::clone(&done);
        background.spawn(async move {
            inner.spawn(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        background.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settle_survives_panicking_task() {
        let background = Background::new();
        background.spawn(async { panic!("boom") });
        background.settle().await;
        assert_eq!(background.pending(), 0);
    }

    #[tokio::test]
    async fn test_settle_when_idle() {
        Background::new().settle().await;
    }
}
