//! Bounded-concurrency task queue runner (component B).
//!
//! Modelled on the teacher's `FuturesUnordered`-windowed concurrent scanner:
//! rather than `tokio::spawn`ing each probe (which would require `'static`
//! ownership of the `Service` being probed), a fixed-size window of futures
//! borrowing directly from the caller's slice is driven to completion
//! in-place. No task outlives the runner's own `await`.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag polled between probe steps; set to stop issuing new probes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives up to `workers` futures concurrently until the whole batch completes.
pub struct TaskQueueRunner {
    workers: usize,
}

impl TaskQueueRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Run every future in `tasks`, at most `workers` in flight at once.
    pub async fn run<I, Fut>(&self, tasks: I)
    where
        I: IntoIterator<Item = Fut>,
        Fut: Future<Output = ()>,
    {
        let mut pending = tasks.into_iter();
        let mut in_flight = FuturesUnordered::new();

        for task in pending.by_ref().take(self.workers) {
            in_flight.push(task);
        }

        while in_flight.next().await.is_some() {
            if let Some(task) = pending.next() {
                in_flight.push(task);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn runs_every_task_exactly_once() {
        let runner = TaskQueueRunner::new(2);
        let completed = Arc::new(AtomicUsize::new(0));

        let tasks = (0..10).map(|_| {
            let completed = Arc::clone(&completed);
            async move {
                completed.fetch_add(1, Ordering::SeqCst);
            }
        });

        runner.run(tasks).await;
        assert_eq!(completed.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn cancel_token_reflects_cancellation() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
