//! Work that runs at most once, on whichever thread gets to it first

use parking_lot::Mutex;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A unit of work posted to the thread pool that a waiter may also run inline.
///
/// Whoever calls [`SingleInvokeTask::invoke`] first runs the work; later
/// calls do nothing. This lets a thread waiting on posted work execute it
/// itself when the pool is saturated instead of deadlocking.
pub struct SingleInvokeTask {
    task: Mutex<Option<Task>>,
}

impl SingleInvokeTask {
    pub fn new<F>(work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            task: Mutex::new(Some(Box::new(work))),
        }
    }

    /// A task with nothing to run
    pub fn empty() -> Self {
        Self {
            task: Mutex::new(None),
        }
    }

    /// Run the work if nobody has yet. Returns whether this call ran it.
    pub fn invoke(&self) -> bool {
        // Take under the lock, run outside it
        let task = self.task.lock().take();
        match task {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }

    /// Whether the work has been taken by some caller
    pub fn is_consumed(&self) -> bool {
        self.task.lock().is_none()
    }
}

impl std::fmt::Debug for SingleInvokeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleInvokeTask")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
