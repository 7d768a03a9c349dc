//! Concurrency tests for the runtime primitives
//!
//! These tests combine the primitives the way the lifecycle engine does and
//! check that racing threads converge on one outcome without deadlocking.

use bundleworks_core::FrameworkError;
use bundleworks_runtime::{
    AsyncWorkService, AtomicState, CounterLatch, SingleInvokeTask, TokioWorkService,
    TransitionFuture, TransitionPromise, wait_or_invoke,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

struct Generation {
    future: TransitionFuture,
}

#[test]
fn test_cas_winner_posts_and_losers_share_future() {
    let pool = Arc::new(TokioWorkService::with_defaults().expect("Should create pool"));
    let state = Arc::new(AtomicState::new(Generation {
        future: TransitionFuture::ready(),
    }));
    let initial = state.load();
    let executions = Arc::new(AtomicUsize::new(0));
    let num_threads = 24;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let pool = pool.clone();
            let state = state.clone();
            let initial = initial.clone();
            let executions = executions.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let promise = TransitionPromise::new();
                let candidate = Arc::new(Generation {
                    future: promise.future(),
                });
                match state.compare_and_set(&initial, candidate.clone()) {
                    Ok(()) => {
                        let executions = executions.clone();
                        pool.post(Box::new(move || {
                            executions.fetch_add(1, Ordering::SeqCst);
                            promise.succeed();
                        }));
                        candidate.future.clone()
                    }
                    Err(current) => current.future.clone(),
                }
            })
        })
        .collect();

    let futures: Vec<TransitionFuture> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread should complete"))
        .collect();

    for future in &futures {
        assert_eq!(future.wait(), Ok(()));
        assert!(future.same_as(&futures[0]));
    }
    assert_eq!(executions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_latch_wait_never_overlaps_participants() {
    let latch = Arc::new(CounterLatch::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let num_threads = 16;
    let barrier = Arc::new(Barrier::new(num_threads + 1));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let latch = latch.clone();
            let inside = inside.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                if let Some(_guard) = latch.enter() {
                    inside.fetch_add(1, Ordering::SeqCst);
                    thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    barrier.wait();
    latch.wait();
    assert_eq!(inside.load(Ordering::SeqCst), 0);
    assert!(!latch.count_up());

    for handle in handles {
        handle.join().expect("Thread should complete");
    }
}

#[test]
fn test_many_waiters_on_single_invoke_task() {
    let promise = TransitionPromise::new();
    let future = promise.future();
    let runs = Arc::new(AtomicUsize::new(0));
    let task = {
        let runs = runs.clone();
        Arc::new(SingleInvokeTask::new(move || {
            runs.fetch_add(1, Ordering::SeqCst);
            promise.fulfill(Err(FrameworkError::ComponentFailure("boom".into())));
        }))
    };
    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));

    // Nothing ever posts the task, so one waiter has to run it
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let future = future.clone();
            let task = task.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                wait_or_invoke(&future, &task)
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().expect("Thread should complete");
        assert_eq!(outcome, Err(FrameworkError::ComponentFailure("boom".into())));
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
