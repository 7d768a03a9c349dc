#![allow(non_snake_case)]

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// RuntimeConfig tests

#[test]
fn RuntimeConfig___default___has_expected_values() {
    let config = RuntimeConfig::default();

    assert!(config.worker_threads.is_none());
    assert_eq!(config.thread_name, "bundleworks-worker");
    assert_eq!(config.max_blocking_threads, 512);
}

#[test]
fn RuntimeConfig___builder_chain___combines_options() {
    let config = RuntimeConfig::new()
        .with_worker_threads(2)
        .with_thread_name("test-worker")
        .with_max_blocking_threads(4);

    assert_eq!(config.worker_threads, Some(2));
    assert_eq!(config.thread_name, "test-worker");
    assert_eq!(config.max_blocking_threads, 4);
}

// TokioWorkService tests

#[test]
fn TokioWorkService___new___keeps_config() {
    let service = TokioWorkService::new(RuntimeConfig::new().with_worker_threads(1)).unwrap();

    assert_eq!(service.config().worker_threads, Some(1));
}

#[test]
fn TokioWorkService___submit___runs_work_and_resolves() {
    let service = TokioWorkService::with_defaults().unwrap();
    let runs = Arc::new(AtomicUsize::new(0));

    let future = {
        let runs = runs.clone();
        submit(&service, move || {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };

    assert_eq!(future.wait(), Ok(()));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn TokioWorkService___submit_failing_work___propagates_error() {
    let service = TokioWorkService::with_defaults().unwrap();

    let future = submit(&service, || Err(FrameworkError::SharedLibrary("libgone".into())));

    assert_eq!(future.wait(), Err(FrameworkError::SharedLibrary("libgone".into())));
}

#[test]
fn TokioWorkService___from_handle___posts_to_existing_runtime() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let service = TokioWorkService::from_handle(runtime.handle().clone());

    let future = submit(&service, || Ok(()));

    assert_eq!(future.wait(), Ok(()));
}

// ManualWorkService tests

#[test]
fn ManualWorkService___post___queues_until_run() {
    let service = ManualWorkService::new();
    let runs = Arc::new(AtomicUsize::new(0));
    {
        let runs = runs.clone();
        service.post(Box::new(move || {
            runs.fetch_add(1, Ordering::SeqCst);
        }));
    }

    assert_eq!(service.pending(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert_eq!(service.run_pending(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!service.run_one());
}

#[test]
fn ManualWorkService___dropped_with_queued_work___cancels_futures() {
    let service = ManualWorkService::new();
    let future = submit(&service, || Ok(()));

    drop(service);

    assert_eq!(future.wait(), Err(FrameworkError::Cancelled));
}

// wait_or_invoke tests

#[test]
fn wait_or_invoke___stalled_pool___runs_task_inline() {
    let service = ManualWorkService::new();
    let promise = TransitionPromise::new();
    let future = promise.future();
    let task = Arc::new(SingleInvokeTask::new(move || promise.succeed()));
    {
        let task = task.clone();
        service.post(Box::new(move || {
            task.invoke();
        }));
    }

    let outcome = wait_or_invoke(&future, &task);

    assert_eq!(outcome, Ok(()));
    assert!(task.is_consumed());
    // The pool eventually runs its copy, which is now a no-op
    assert_eq!(service.run_pending(), 1);
}

#[test]
fn wait_or_invoke___completed_future___does_not_invoke() {
    let task = SingleInvokeTask::new(|| {});

    let outcome = wait_or_invoke(&TransitionFuture::ready(), &task);

    assert_eq!(outcome, Ok(()));
    assert!(!task.is_consumed());
}
