//! Shared completion futures for asynchronous state transitions
//!
//! A [`TransitionPromise`] is created before a transition is attempted and
//! its [`TransitionFuture`] is stored in the new state object. Only the
//! thread that wins the transition fulfills the promise; every other caller
//! gets a clone of the same future.

use bundleworks_core::{FrameworkError, FrameworkResult};
use parking_lot::{Condvar, Mutex};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Slot {
    outcome: Option<FrameworkResult<()>>,
    wakers: Vec<Waker>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    completed: Condvar,
}

impl Shared {
    fn complete(&self, outcome: FrameworkResult<()>) -> bool {
        let wakers = {
            let mut slot = self.slot.lock();
            if slot.outcome.is_some() {
                return false;
            }
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.wakers)
        };
        self.completed.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

/// Write side of a [`TransitionFuture`]
///
/// Dropping an unfulfilled promise completes its future with
/// [`FrameworkError::Cancelled`], so waiters never hang on work that was
/// discarded before it ran.
pub struct TransitionPromise {
    shared: Arc<Shared>,
}

impl TransitionPromise {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    /// Get a future observing this promise
    pub fn future(&self) -> TransitionFuture {
        TransitionFuture {
            shared: self.shared.clone(),
        }
    }

    /// Complete the future with `outcome`
    pub fn fulfill(self, outcome: FrameworkResult<()>) {
        self.shared.complete(outcome);
    }

    /// Complete the future successfully
    pub fn succeed(self) {
        self.fulfill(Ok(()));
    }
}

impl Default for TransitionPromise {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransitionPromise {
    fn drop(&mut self) {
        self.shared.complete(Err(FrameworkError::Cancelled));
    }
}

/// Cloneable handle to the outcome of a transition
///
/// Can be waited on synchronously or awaited.
#[derive(Clone)]
pub struct TransitionFuture {
    shared: Arc<Shared>,
}

impl TransitionFuture {
    /// A future that has already completed successfully
    pub fn ready() -> Self {
        Self::completed(Ok(()))
    }

    /// A future that has already completed with `outcome`
    pub fn completed(outcome: FrameworkResult<()>) -> Self {
        let promise = TransitionPromise::new();
        let future = promise.future();
        promise.fulfill(outcome);
        future
    }

    /// Whether the outcome is available
    pub fn is_ready(&self) -> bool {
        self.shared.slot.lock().outcome.is_some()
    }

    /// The outcome, if available, without blocking
    pub fn try_result(&self) -> Option<FrameworkResult<()>> {
        self.shared.slot.lock().outcome.clone()
    }

    /// Block until the outcome is available
    pub fn wait(&self) -> FrameworkResult<()> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = &slot.outcome {
                return outcome.clone();
            }
            self.shared.completed.wait(&mut slot);
        }
    }

    /// Block for at most `timeout`. Returns `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<FrameworkResult<()>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = &slot.outcome {
                return Some(outcome.clone());
            }
            if self.shared.completed.wait_until(&mut slot, deadline).timed_out() {
                return slot.outcome.clone();
            }
        }
    }

    /// Whether both handles observe the same promise
    pub fn same_as(&self, other: &TransitionFuture) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::future::Future for TransitionFuture {
    type Output = FrameworkResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.shared.slot.lock();
        if let Some(outcome) = &slot.outcome {
            return Poll::Ready(outcome.clone());
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl std::fmt::Debug for TransitionFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionFuture")
            .field("outcome", &self.try_result())
            .finish()
    }
}

#[cfg(test)]
#[path = "future/future_tests.rs"]
mod future_tests;
