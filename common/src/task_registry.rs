//! In-flight background task bookkeeping shared by `BackgroundIngestion`
//! and `BackgroundCrawl`: at-most-one in-flight task per id,
//! idempotent `trigger`, and a `wait_for_all` that never propagates a
//! task's own failure.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct TaskRegistry {
    in_flight: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `work` for `id` unless a task for that id is already
    /// in-flight. A no-op on a duplicate trigger. Once a task completes
    /// its id is removed, so a later call for the same id legally
    /// starts a fresh run.
    pub fn trigger<F>(&self, id: String, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.contains_key(&id) {
            return;
        }

        let in_flight = Arc::clone(&self.in_flight);
        let cleanup_id = id.clone();
        let handle = tokio::spawn(async move {
            if let Err(panic) = AssertUnwindSafe(work).catch_unwind().await {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(%message, "background task panicked");
            }
            if let Ok(mut guard) = in_flight.lock() {
                guard.remove(&cleanup_id);
            }
        });
        guard.insert(id, handle);
    }

    /// Awaits every task that was in-flight at the moment of the call,
    /// swallowing individual task failures.
    pub async fn wait_for_all(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "background task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn duplicate_trigger_for_the_same_id_runs_once() {
        let registry = TaskRegistry::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let runs = Arc::clone(&runs);
            registry.trigger("doc-1".into(), async move {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        registry.wait_for_all().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_for_all_does_not_propagate_task_panics() {
        let registry = TaskRegistry::new();
        registry.trigger("doc-2".into(), async move {
            panic!("boom");
        });
        registry.wait_for_all().await;
    }

    #[tokio::test]
    async fn a_completed_task_may_be_retriggered() {
        let registry = TaskRegistry::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let first_runs = Arc::clone(&runs);
        registry.trigger("doc-3".into(), async move {
            first_runs.fetch_add(1, Ordering::SeqCst);
        });
        registry.wait_for_all().await;

        let second_runs = Arc::clone(&runs);
        registry.trigger("doc-3".into(), async move {
            second_runs.fetch_add(1, Ordering::SeqCst);
        });
        registry.wait_for_all().await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
