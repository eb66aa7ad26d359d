//! Bounded-concurrency FIFO executor.
//!
//! Submitted tasks run in submission order, at most `max_concurrent` at a
//! time. `submit` never blocks and never fails the caller. A task that panics
//! is logged and its slot is released; the pool keeps running.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

type Task = BoxFuture<'static, ()>;

/// Default number of concurrently running tasks.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

pub struct WorkerPool {
    queue_tx: mpsc::UnboundedSender<Task>,
    max_concurrent: usize,
    active: Arc<AtomicUsize>,
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl WorkerPool {
    /// Start the pool's dispatcher. Must be called from within a Tokio runtime.
    ///
    /// A `max_concurrent` of zero is treated as one.
    pub fn start(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let pool = Self {
            queue_tx,
            max_concurrent,
            active: Arc::new(AtomicUsize::new(0)),
            pending: Arc::new(AtomicUsize::new(0)),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        };

        tokio::spawn(dispatch_loop(
            queue_rx,
            Arc::new(Semaphore::new(max_concurrent)),
            Arc::clone(&pool.active),
            Arc::clone(&pool.pending),
            pool.cancel.clone(),
            pool.tracker.clone(),
        ));

        tracing::info!(max_concurrent, "Worker pool started");
        pool
    }

    /// Append a task to the queue. Returns immediately.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.queue_tx.send(task.boxed()).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Worker pool is shut down, task dropped");
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Tasks currently running.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Tasks submitted but not yet started.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stop dispatching and wait for running tasks to finish.
    ///
    /// Tasks still waiting in the queue are discarded.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!(discarded = self.pending(), "Worker pool stopped");
    }
}

/// Pull tasks in FIFO order, starting one whenever a slot is free.
async fn dispatch_loop(
    mut queue_rx: mpsc::UnboundedReceiver<Task>,
    slots: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&slots).acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };
        let task = tokio::select! {
            _ = cancel.cancelled() => break,
            task = queue_rx.recv() => match task {
                Some(t) => t,
                None => break,
            },
        };

        pending.fetch_sub(1, Ordering::SeqCst);
        active.fetch_add(1, Ordering::SeqCst);
        let slot = SlotGuard {
            _permit: permit,
            active: Arc::clone(&active),
        };

        tracker.spawn(async move {
            let _slot = slot;
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                tracing::error!("Worker task panicked");
            }
        });
    }
    tracing::debug!("Worker pool dispatcher exited");
}

/// Releases a concurrency slot when the task holding it ends, however it ends.
struct SlotGuard {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Poll `cond` until it holds or a generous deadline passes.
    async fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while !cond() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached in time"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_max_concurrent() {
        let pool = WorkerPool::start(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pool.submit(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        wait_until(|| done.load(Ordering::SeqCst) == 20).await;
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2, "pool should run tasks in parallel");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_task_runs_exactly_once() {
        let pool = WorkerPool::start(2);
        let counts: Arc<Vec<AtomicUsize>> =
            Arc::new((0..1000).map(|_| AtomicUsize::new(0)).collect());

        for i in 0..1000 {
            let counts = Arc::clone(&counts);
            pool.submit(async move {
                counts[i].fetch_add(1, Ordering::SeqCst);
            });
        }

        wait_until(|| pool.pending() == 0 && pool.active() == 0).await;
        assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn tasks_start_in_submission_order() {
        let pool = WorkerPool::start(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let order = Arc::clone(&order);
            pool.submit(async move {
                order.lock().unwrap().push(i);
            });
        }

        wait_until(|| order.lock().unwrap().len() == 10).await;
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn submit_returns_while_slots_are_busy() {
        let pool = WorkerPool::start(1);
        let release = CancellationToken::new();

        let gate = release.clone();
        pool.submit(async move { gate.cancelled().await });
        pool.submit(async {});
        pool.submit(async {});

        wait_until(|| pool.active() == 1).await;
        assert_eq!(pool.pending(), 2);

        release.cancel();
        wait_until(|| pool.pending() == 0 && pool.active() == 0).await;
    }

    #[tokio::test]
    async fn panicking_task_releases_its_slot() {
        let pool = WorkerPool::start(1);
        let ran = Arc::new(AtomicUsize::new(0));

        pool.submit(async { panic!("task blew up") });
        let after = Arc::clone(&ran);
        pool.submit(async move {
            after.fetch_add(1, Ordering::SeqCst);
        });

        wait_until(|| ran.load(Ordering::SeqCst) == 1).await;
        wait_until(|| pool.active() == 0).await;
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped_to_one() {
        let pool = WorkerPool::start(0);
        assert_eq!(pool.max_concurrent(), 1);

        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        pool.submit(async move {
            r.fetch_add(1, Ordering::SeqCst);
        });
        wait_until(|| ran.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn shutdown_waits_for_running_tasks_and_rejects_new_ones() {
        let pool = WorkerPool::start(1);
        let finished = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&finished);
        pool.submit(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            f.fetch_add(1, Ordering::SeqCst);
        });
        wait_until(|| pool.active() == 1).await;

        pool.shutdown().await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        // The dispatcher is gone; the task is accepted without error but
        // never runs.
        let f = Arc::clone(&finished);
        pool.submit(async move {
            f.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
