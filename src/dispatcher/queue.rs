use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

pub(crate) type Task = Box<dyn FnOnce() + Send + 'static>;

/// FIFO task queue with its own lock and wake-up signal.
#[derive(Default)]
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    stopped: bool,
}

impl TaskQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a task; hands it back if the queue has stopped.
    pub(crate) fn push(&self, task: Task) -> Result<(), Task> {
        {
            let mut state = self.lock();
            if state.stopped {
                return Err(task);
            }
            state.tasks.push_back(task);
        }
        self.ready.notify_one();
        Ok(())
    }

    /// Next task, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is stopped and fully drained.
    pub(crate) fn pop(&self) -> Option<Task> {
        let mut state = self.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.stopped {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Refuse new tasks and wake every waiting worker; queued tasks still run.
    pub(crate) fn stop(&self) -> bool {
        let newly_stopped = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.stopped, true)
        };
        self.ready.notify_all();
        newly_stopped
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn stopped_queue_drains_before_returning_none() {
        let queue = TaskQueue::default();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            assert!(queue.push(Box::new(move || {
                ran.fetch_add(1, Ordering::SeqCst);
            })).is_ok());
        }
        assert!(queue.stop());
        assert!(!queue.stop());
        assert!(queue.push(Box::new(|| {})).is_err());
        while let Some(task) = queue.pop() {
            task();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(queue.len(), 0);
    }
}
