//! Counting latch guarding in-flight activations

use parking_lot::{Condvar, Mutex};

/// A latch that any number of participants can enter and leave, with a
/// one-shot wait for all of them to drain.
///
/// After [`CounterLatch::wait`] returns the latch is poisoned and refuses
/// new participants. Each state object owns a fresh latch, so a latch is
/// never reused once it has been waited on.
#[derive(Debug, Default)]
pub struct CounterLatch {
    state: Mutex<LatchState>,
    drained: Condvar,
}

#[derive(Debug, Default)]
struct LatchState {
    count: usize,
    poisoned: bool,
}

impl CounterLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one participant. Returns `false` once the latch is poisoned.
    pub fn count_up(&self) -> bool {
        let mut state = self.state.lock();
        if state.poisoned {
            return false;
        }
        state.count += 1;
        true
    }

    /// Deregister one participant, waking waiters when none remain
    pub fn count_down(&self) {
        let mut state = self.state.lock();
        state.count = state.count.saturating_sub(1);
        if state.count == 0 {
            self.drained.notify_all();
        }
    }

    /// Enter the latch, leaving it again when the guard drops
    pub fn enter(&self) -> Option<LatchGuard<'_>> {
        self.count_up().then_some(LatchGuard { latch: self })
    }

    /// Current number of participants
    pub fn count(&self) -> usize {
        self.state.lock().count
    }

    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned
    }

    /// Block until no participants remain, then poison the latch
    pub fn wait(&self) {
        let mut state = self.state.lock();
        while state.count > 0 {
            self.drained.wait(&mut state);
        }
        state.poisoned = true;
    }
}

/// Participation in a [`CounterLatch`], released on drop
#[derive(Debug)]
pub struct LatchGuard<'a> {
    latch: &'a CounterLatch,
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}
