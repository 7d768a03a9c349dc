#![allow(non_snake_case)]

use super::*;
use std::thread;

#[test]
fn TransitionFuture___ready___is_immediately_ok() {
    let future = TransitionFuture::ready();

    assert!(future.is_ready());
    assert_eq!(future.wait(), Ok(()));
}

#[test]
fn TransitionFuture___before_fulfill___is_pending() {
    let promise = TransitionPromise::new();

    let future = promise.future();

    assert!(!future.is_ready());
    assert!(future.try_result().is_none());
}

#[test]
fn TransitionFuture___fulfilled_with_error___every_clone_sees_error() {
    let promise = TransitionPromise::new();
    let first = promise.future();
    let second = first.clone();

    promise.fulfill(Err(FrameworkError::SharedLibrary("missing".into())));

    assert_eq!(first.wait(), Err(FrameworkError::SharedLibrary("missing".into())));
    assert_eq!(second.wait(), Err(FrameworkError::SharedLibrary("missing".into())));
}

#[test]
fn TransitionPromise___dropped_unfulfilled___cancels_future() {
    let promise = TransitionPromise::new();
    let future = promise.future();

    drop(promise);

    assert_eq!(future.wait(), Err(FrameworkError::Cancelled));
}

#[test]
fn TransitionFuture___wait_timeout_pending___returns_none() {
    let promise = TransitionPromise::new();
    let future = promise.future();

    let outcome = future.wait_timeout(Duration::from_millis(10));

    assert!(outcome.is_none());
    promise.succeed();
}

#[test]
fn TransitionFuture___wait___unblocks_when_fulfilled_elsewhere() {
    let promise = TransitionPromise::new();
    let future = promise.future();

    let fulfiller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        promise.succeed();
    });

    assert_eq!(future.wait(), Ok(()));
    fulfiller.join().unwrap();
}

#[test]
fn TransitionFuture___same_as___compares_identity() {
    let promise = TransitionPromise::new();
    let a = promise.future();
    let b = promise.future();

    assert!(a.same_as(&b));
    assert!(!a.same_as(&TransitionFuture::ready()));
}

#[tokio::test]
async fn TransitionFuture___await___resolves_after_fulfill() {
    let promise = TransitionPromise::new();
    let future = promise.future();

    let fulfiller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        promise.succeed();
    });
    let outcome = future.await;

    assert_eq!(outcome, Ok(()));
    fulfiller.join().unwrap();
}

#[tokio::test]
async fn TransitionFuture___await_completed_error___returns_error() {
    let future = TransitionFuture::completed(Err(FrameworkError::Timeout));

    assert_eq!(future.await, Err(FrameworkError::Timeout));
}
