//! Atomically replaceable shared state

use arc_swap::{ArcSwap, Guard};
use std::sync::Arc;

/// A shared pointer to an immutable state object that can be loaded and
/// replaced with compare-and-set.
///
/// State objects are never mutated in place. A transition builds a fresh
/// state and installs it only if the state the caller observed is still
/// current, so exactly one of several racing callers wins each transition.
pub struct AtomicState<S> {
    current: ArcSwap<S>,
}

impl<S> AtomicState<S> {
    /// Create a pointer holding `initial`
    pub fn new(initial: S) -> Self {
        Self::from_arc(Arc::new(initial))
    }

    /// Create a pointer holding an already shared state
    pub fn from_arc(initial: Arc<S>) -> Self {
        Self {
            current: ArcSwap::new(initial),
        }
    }

    /// Read the current state. Never blocks.
    pub fn load(&self) -> Arc<S> {
        self.current.load_full()
    }

    /// Replace the state with `desired` iff it is still `expected`.
    ///
    /// Identity is pointer identity. On failure the state that is current
    /// now is returned so the caller can re-evaluate.
    pub fn compare_and_set(&self, expected: &Arc<S>, desired: Arc<S>) -> Result<(), Arc<S>> {
        let previous = self.current.compare_and_swap(expected, desired);
        if Arc::ptr_eq(&*previous, expected) {
            Ok(())
        } else {
            Err(Guard::into_inner(previous))
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for AtomicState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicState").field(&self.load()).finish()
    }
}
