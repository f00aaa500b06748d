use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

/// Spawn-all-then-join task group with an optional in-flight bound.
///
/// Every task is spawned immediately; when a bound is set, tasks wait on a
/// shared semaphore before doing any work. [`join`](Self::join) returns only
/// after every task has finished, so callers never observe a partially
/// populated result set.
///
/// Each task carries a key (the environment it works on) so a task that
/// panics can still be attributed.
pub(crate) struct TaskGroup<T> {
    tasks: JoinSet<T>,
    keys: HashMap<task::Id, String>,
    limiter: Option<Arc<Semaphore>>,
}

/// A task that ended without producing an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LostTask {
    pub(crate) key: String,
    pub(crate) error: String,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub(crate) fn new(max_concurrency: Option<usize>) -> Self {
        Self {
            tasks: JoinSet::new(),
            keys: HashMap::new(),
            limiter: max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    pub(crate) fn spawn<F>(&mut self, key: impl Into<String>, fut: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let limiter = self.limiter.clone();
        let handle = self.tasks.spawn(async move {
            let _permit = match limiter {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            fut.await
        });
        self.keys.insert(handle.id(), key.into());
    }

    /// Wait for every task. Outputs are in completion order; tasks that
    /// panicked come back as [`LostTask`]s under the key they were spawned
    /// with.
    pub(crate) async fn join(mut self) -> (Vec<T>, Vec<LostTask>) {
        let mut done = Vec::with_capacity(self.tasks.len());
        let mut lost = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(value) => done.push(value),
                Err(e) => lost.push(LostTask {
                    key: self.keys.remove(&e.id()).unwrap_or_default(),
                    error: e.to_string(),
                }),
            }
        }
        (done, lost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn join_collects_every_output() {
        let mut group = TaskGroup::new(None);
        for n in 0..20u64 {
            group.spawn(n.to_string(), async move {
                tokio::time::sleep(Duration::from_millis((20 - n) % 7)).await;
                n
            });
        }
        let (mut done, lost) = group.join().await;
        done.sort_unstable();
        assert_eq!(done, (0..20).collect::<Vec<_>>());
        assert!(lost.is_empty());
    }

    #[tokio::test]
    async fn bound_limits_in_flight_tasks() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new(Some(2));
        for _ in 0..8 {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            group.spawn("task", async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        let (done, _) = group.join().await;
        assert_eq!(done.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn panicking_task_is_reported_not_propagated() {
        let mut group = TaskGroup::new(None);
        group.spawn("dev", async { 1 });
        group.spawn("prod", async { panic!("boom") });
        let (done, lost) = group.join().await;
        assert_eq!(done, vec![1]);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].key, "prod");
        assert!(lost[0].error.contains("boom"));
    }
}
