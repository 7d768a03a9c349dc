#![allow(non_snake_case)]

use bundleworks_core::{FrameworkResult, Properties};
use bundleworks_framework::{
    ServiceEvent, ServiceEventKind, ServiceFactory, ServiceObject, ServiceRegistration,
    ServiceRegistry, ServiceSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

#[test]
fn ServiceRegistry___concurrent_registration___assigns_unique_ids() {
    let registry = ServiceRegistry::new();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..20)
                    .map(|_| {
                        registry
                            .register(
                                i as u64,
                                &["sample::Greeting".to_string()],
                                ServiceSource::Object(Arc::new(i)),
                                Properties::new(),
                            )
                            .unwrap()
                            .id()
                    })
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), THREADS * 20);
    assert_eq!(registry.find("sample::Greeting", None).len(), THREADS * 20);
}

#[test]
fn ServiceRegistry___concurrent_unregister___fires_one_event_per_service() {
    let registry = ServiceRegistry::new();
    let unregistering = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&unregistering);
    registry.add_listener(
        None,
        Arc::new(move |event: &ServiceEvent| {
            if event.kind == ServiceEventKind::Unregistering {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }),
    );
    let registrations: Vec<ServiceRegistration> = (0..10)
        .map(|i| {
            registry
                .register(
                    1,
                    &["a".to_string()],
                    ServiceSource::Object(Arc::new(i)),
                    Properties::new(),
                )
                .unwrap()
        })
        .collect();
    let registrations = Arc::new(registrations);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registrations = Arc::clone(&registrations);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registrations.iter().filter(|r| r.unregister()).count()
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 10);
    assert_eq!(unregistering.load(Ordering::SeqCst), 10);
}

struct SlowFactory {
    created: AtomicUsize,
    released: AtomicUsize,
}

impl ServiceFactory for SlowFactory {
    fn get_service(
        &self,
        _requester: u64,
        _registration: &ServiceRegistration,
    ) -> FrameworkResult<ServiceObject> {
        self.created.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(5));
        Ok(Arc::new(()))
    }

    fn unget_service(&self, _requester: u64, _registration: &ServiceRegistration, _service: ServiceObject) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn ServiceRegistry___concurrent_factory_gets___share_one_cached_object() {
    let registry = ServiceRegistry::new();
    let factory = Arc::new(SlowFactory {
        created: AtomicUsize::new(0),
        released: AtomicUsize::new(0),
    });
    let registration = registry
        .register(
            1,
            &["a".to_string()],
            ServiceSource::Factory(factory.clone()),
            Properties::new(),
        )
        .unwrap();
    let reference = registration.reference().unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let reference = reference.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_service(7, &reference).unwrap().unwrap()
            })
        })
        .collect();
    let objects: Vec<ServiceObject> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(objects.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    let created = factory.created.load(Ordering::SeqCst);
    // losers of the cache race release their extra object straight away
    assert_eq!(factory.released.load(Ordering::SeqCst), created - 1);

    registration.unregister();

    assert_eq!(factory.released.load(Ordering::SeqCst), created);
}
