//! Thread pool used for asynchronous lifecycle work

use crate::future::{TransitionFuture, TransitionPromise};
use crate::task::SingleInvokeTask;
use bundleworks_core::{FrameworkError, FrameworkResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};

/// How long a waiter gives the pool before running posted work itself
pub const POOL_STALL_TIMEOUT: Duration = Duration::from_millis(50);

/// A unit of work posted to an [`AsyncWorkService`]
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Executor abstraction the lifecycle engine posts its work to
pub trait AsyncWorkService: Send + Sync {
    /// Schedule `work` to run on some other thread
    fn post(&self, work: WorkItem);
}

/// Post `work` and get a future for its outcome
pub fn submit<F>(service: &dyn AsyncWorkService, work: F) -> TransitionFuture
where
    F: FnOnce() -> FrameworkResult<()> + Send + 'static,
{
    let promise = TransitionPromise::new();
    let future = promise.future();
    service.post(Box::new(move || promise.fulfill(work())));
    future
}

/// Wait for `future`, running `task` inline if the pool has not picked it
/// up within [`POOL_STALL_TIMEOUT`].
pub fn wait_or_invoke(future: &TransitionFuture, task: &SingleInvokeTask) -> FrameworkResult<()> {
    if future.wait_timeout(POOL_STALL_TIMEOUT).is_none() && task.invoke() {
        tracing::debug!("Posted task not started by the pool, ran it inline");
    }
    future.wait()
}

/// Configuration for the lifecycle thread pool
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads (None = number of CPU cores)
    pub worker_threads: Option<usize>,
    /// Name prefix for worker threads
    pub thread_name: String,
    /// Maximum threads running posted work at once
    pub max_blocking_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: "bundleworks-worker".to_string(),
            max_blocking_threads: 512,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Set the thread name prefix
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Bound the number of concurrently running posted tasks
    pub fn with_max_blocking_threads(mut self, threads: usize) -> Self {
        self.max_blocking_threads = threads;
        self
    }
}

/// [`AsyncWorkService`] backed by the blocking pool of a Tokio runtime
///
/// Posted work may block (it waits on other transitions), so it always runs
/// through `spawn_blocking`.
pub struct TokioWorkService {
    handle: Handle,
    runtime: Option<Runtime>,
    config: RuntimeConfig,
}

impl TokioWorkService {
    /// Create a service owning a new runtime
    pub fn new(config: RuntimeConfig) -> FrameworkResult<Self> {
        let mut builder = Builder::new_multi_thread();

        if let Some(threads) = config.worker_threads {
            builder.worker_threads(threads);
        }

        builder
            .thread_name(&config.thread_name)
            .max_blocking_threads(config.max_blocking_threads)
            .enable_time();

        let runtime = builder
            .build()
            .map_err(|e| FrameworkError::RuntimeError(format!("Failed to create runtime: {}", e)))?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            config,
        })
    }

    /// Create a service with default configuration
    pub fn with_defaults() -> FrameworkResult<Self> {
        Self::new(RuntimeConfig::default())
    }

    /// Post onto a runtime owned by someone else
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            runtime: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl AsyncWorkService for TokioWorkService {
    fn post(&self, work: WorkItem) {
        // Completion is observed through the work's own promise
        drop(self.handle.spawn_blocking(work));
    }
}

impl Drop for TokioWorkService {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Dropping may happen on a pool thread, so never block here.
            // Work that never started is dropped, cancelling its promise.
            runtime.shutdown_background();
            tracing::debug!("Lifecycle thread pool shut down");
        }
    }
}

/// [`AsyncWorkService`] that only runs work when told to.
///
/// Useful for driving transitions step by step and for simulating a pool
/// that has stalled.
#[derive(Default)]
pub struct ManualWorkService {
    queue: Mutex<VecDeque<WorkItem>>,
}

impl ManualWorkService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of posted items not yet run
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest posted item. Returns `false` if none was queued.
    pub fn run_one(&self) -> bool {
        let next = self.queue.lock().pop_front();
        match next {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Run queued items, including ones posted while running, until empty
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }
}

impl AsyncWorkService for ManualWorkService {
    fn post(&self, work: WorkItem) {
        self.queue.lock().push_back(work);
    }
}

#[cfg(test)]
#[path = "work/work_tests.rs"]
mod work_tests;
