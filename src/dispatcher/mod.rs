//! Fixed-size worker pool running queued database work.
//!
//! Tasks run in FIFO order on named worker threads and report through a
//! [`Deferred`]. A panicking task fails its own result; the worker survives.

mod deferred;
mod queue;

pub use deferred::Deferred;

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::PooledSqlError;

use queue::{Task, TaskQueue};

pub struct Dispatcher {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl Dispatcher {
    /// Number of workers used when none is configured.
    #[must_use]
    pub fn default_size() -> usize {
        thread::available_parallelism().map_or(1, NonZeroUsize::get)
    }

    /// Spawn `threads` workers (at least one).
    ///
    /// # Errors
    /// Returns [`PooledSqlError::TaskFailed`] if a worker thread cannot be spawned.
    pub fn new(threads: usize) -> Result<Self, PooledSqlError> {
        let size = threads.max(1);
        let queue = Arc::new(TaskQueue::default());
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let worker_queue = Arc::clone(&queue);
            let spawned = thread::Builder::new()
                .name(format!("pooled-sql-worker-{index}"))
                .spawn(move || run_worker(&worker_queue));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    queue.stop();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PooledSqlError::TaskFailed(format!(
                        "failed to spawn worker thread: {err}"
                    )));
                }
            }
        }
        info!(workers = size, "dispatcher started");
        Ok(Self {
            queue,
            workers: Mutex::new(workers),
            size,
        })
    }

    /// Queue `task` and return its deferred result immediately.
    ///
    /// After [`Dispatcher::shutdown`] the result resolves to
    /// [`PooledSqlError::DispatcherStopped`] without running the task.
    pub fn submit<T, F>(&self, task: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, PooledSqlError> + Send + 'static,
    {
        let (resolver, deferred) = deferred::channel();
        let job: Task = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                .unwrap_or_else(|payload| Err(PooledSqlError::TaskFailed(panic_message(&*payload))));
            resolver.resolve(outcome);
        });
        match self.queue.push(job) {
            Ok(()) => {
                debug!("task queued");
                deferred
            }
            Err(_) => Deferred::ready(Err(PooledSqlError::DispatcherStopped)),
        }
    }

    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.size
    }

    /// Tasks waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.queue.is_stopped()
    }

    /// Stop accepting tasks, let the workers finish what is queued, and join them.
    pub fn shutdown(&self) {
        self.join();
    }

    /// Stop accepting tasks without waiting; queued tasks still run.
    pub fn stop(&self) {
        if self.queue.stop() {
            debug!("dispatcher stopping");
        }
    }

    /// Wait for the workers to drain the queue and exit; stops the dispatcher
    /// first if that has not happened yet.
    pub fn join(&self) {
        self.stop();
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if workers.is_empty() {
            return;
        }
        let current = thread::current().id();
        for handle in workers {
            // a task that shuts down its own dispatcher cannot join itself
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("dispatcher worker exited abnormally");
            }
        }
        info!("dispatcher stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.size)
            .field("pending", &self.pending())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn run_worker(queue: &TaskQueue) {
    while let Some(task) = queue.pop() {
        task();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_threads_still_gets_one_worker() {
        let dispatcher = Dispatcher::new(0).unwrap();
        assert_eq!(dispatcher.worker_count(), 1);
        assert_eq!(dispatcher.submit(|| Ok(2 + 2)).wait().unwrap(), 4);
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let failed = dispatcher.submit::<(), _>(|| panic!("boom"));
        match failed.wait() {
            Err(PooledSqlError::TaskFailed(msg)) => assert!(msg.contains("boom")),
            other => panic!("expected task failure, got {other:?}"),
        }
        assert_eq!(dispatcher.submit(|| Ok("alive")).wait().unwrap(), "alive");
    }

    #[test]
    fn shutdown_drains_queued_tasks() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let results: Vec<_> = (0..5)
            .map(|_| {
                let ran = Arc::clone(&ran);
                dispatcher.submit(move || {
                    thread::sleep(Duration::from_millis(5));
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        dispatcher.shutdown();
        assert_eq!(ran.load(Ordering::SeqCst), 5);
        for result in results {
            assert!(result.wait().is_ok());
        }
    }

    #[test]
    fn stop_rejects_new_work_but_runs_queued() {
        let dispatcher = Dispatcher::new(1).unwrap();
        let queued = dispatcher.submit(|| {
            thread::sleep(Duration::from_millis(5));
            Ok(7)
        });
        dispatcher.stop();
        assert!(dispatcher.is_stopped());
        assert!(matches!(
            dispatcher.submit(|| Ok(0)).wait(),
            Err(PooledSqlError::DispatcherStopped)
        ));
        dispatcher.join();
        assert_eq!(queued.wait().unwrap(), 7);
    }

    #[test]
    fn submit_after_shutdown_is_rejected() {
        let dispatcher = Dispatcher::new(2).unwrap();
        dispatcher.shutdown();
        assert!(matches!(
            dispatcher.submit(|| Ok(1)).wait(),
            Err(PooledSqlError::DispatcherStopped)
        ));
    }
}
