//! bundleworks-runtime - Concurrency primitives for the lifecycle engine
//!
//! This crate provides:
//! - [`AtomicState`] for compare-and-set transitions on shared state objects
//! - [`CounterLatch`] for draining in-flight activations
//! - [`TransitionPromise`] / [`TransitionFuture`] for sharing one transition outcome
//! - [`SingleInvokeTask`] for work that a waiter may run inline
//! - [`AsyncWorkService`] and its Tokio-backed [`TokioWorkService`]

mod atomic;
mod future;
mod latch;
mod task;
mod work;

pub use atomic::AtomicState;
pub use future::{TransitionFuture, TransitionPromise};
pub use latch::{CounterLatch, LatchGuard};
pub use task::SingleInvokeTask;
pub use work::{
    AsyncWorkService, ManualWorkService, POOL_STALL_TIMEOUT, RuntimeConfig, TokioWorkService,
    WorkItem, submit, wait_or_invoke,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        AsyncWorkService, AtomicState, CounterLatch, RuntimeConfig, SingleInvokeTask,
        TokioWorkService, TransitionFuture, TransitionPromise,
    };
}
