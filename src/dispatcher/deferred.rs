use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::error::PooledSqlError;

/// Result of a task handed to the dispatcher, resolved exactly once.
///
/// Block on it with [`Deferred::wait`] from synchronous code, or `.await` it
/// from async code.
#[derive(Debug)]
#[must_use = "a deferred result does nothing unless waited on"]
pub struct Deferred<T> {
    receiver: oneshot::Receiver<Result<T, PooledSqlError>>,
}

/// Producer side held by the worker.
pub(crate) struct Resolver<T> {
    sender: oneshot::Sender<Result<T, PooledSqlError>>,
}

pub(crate) fn channel<T>() -> (Resolver<T>, Deferred<T>) {
    let (sender, receiver) = oneshot::channel();
    (Resolver { sender }, Deferred { receiver })
}

impl<T> Resolver<T> {
    pub(crate) fn resolve(self, outcome: Result<T, PooledSqlError>) {
        // the caller may have dropped its Deferred
        let _ = self.sender.send(outcome);
    }
}

fn dropped() -> PooledSqlError {
    PooledSqlError::TaskFailed("task was dropped before producing a result".into())
}

impl<T> Deferred<T> {
    /// A result that is already known.
    pub(crate) fn ready(outcome: Result<T, PooledSqlError>) -> Self {
        let (resolver, deferred) = channel();
        resolver.resolve(outcome);
        deferred
    }

    /// Block the current thread until the task finishes.
    ///
    /// Inside an async runtime `.await` the value instead; blocking there is refused.
    ///
    /// # Errors
    /// Returns the task's own error, or [`PooledSqlError::TaskFailed`] if the task
    /// panicked or was dropped unrun, or if called from within a tokio runtime.
    pub fn wait(self) -> Result<T, PooledSqlError> {
        if Handle::try_current().is_ok() {
            return Err(PooledSqlError::TaskFailed(
                "Deferred::wait called inside an async runtime; await it instead".into(),
            ));
        }
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(dropped()))
    }

    /// Take the result if it is ready, otherwise hand the deferred back.
    ///
    /// # Errors
    /// `Err(self)` while the task is still running.
    pub fn try_take(mut self) -> Result<Result<T, PooledSqlError>, Self> {
        match self.receiver.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Closed) => Ok(Err(dropped())),
        }
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, PooledSqlError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|_| Err(dropped())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_value_is_taken_once() {
        let deferred = Deferred::ready(Ok(5));
        assert_eq!(deferred.try_take().ok().map(Result::unwrap), Some(5));
    }

    #[test]
    fn pending_deferred_is_handed_back() {
        let (resolver, deferred) = channel::<u8>();
        let deferred = deferred.try_take().unwrap_err();
        resolver.resolve(Ok(1));
        assert_eq!(deferred.wait().unwrap(), 1);
    }

    #[test]
    fn dropped_resolver_reports_task_failure() {
        let (resolver, deferred) = channel::<()>();
        drop(resolver);
        assert!(matches!(deferred.wait(), Err(PooledSqlError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn blocking_wait_inside_runtime_is_refused() {
        let deferred = Deferred::ready(Ok(3));
        assert!(matches!(deferred.wait(), Err(PooledSqlError::TaskFailed(_))));
    }

    #[tokio::test]
    async fn deferred_can_be_awaited() {
        let (resolver, deferred) = channel::<&'static str>();
        std::thread::spawn(move || resolver.resolve(Ok("done")));
        assert_eq!(deferred.await.unwrap(), "done");
    }
}
