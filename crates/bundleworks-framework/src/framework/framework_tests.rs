#![allow(non_snake_case)]

use super::*;
use crate::registry::ServiceSource;
use bundleworks_core::Properties;

#[test]
fn Framework___new___has_system_bundle() {
    let framework = Framework::new();

    let system = framework.system_bundle().unwrap();

    assert_eq!(system.id(), 0);
    assert_eq!(system.symbolic_name(), SYSTEM_BUNDLE_NAME);
}

#[test]
fn Framework___install_bundle___assigns_increasing_ids() {
    let framework = Framework::new();

    let first = framework.install_bundle("a", serde_json::Value::Null);
    let second = framework.install_bundle("b", serde_json::Value::Null);

    assert_eq!(first.id(), 1);
    assert_eq!(second.id(), 2);
    let ids: Vec<u64> = framework.bundles().iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn Framework___uninstall_bundle___withdraws_its_services() {
    let framework = Framework::new();
    let bundle = framework.install_bundle("a", serde_json::Value::Null);
    let registration = bundle
        .context()
        .register_service(
            &["sample::Greeting".to_string()],
            ServiceSource::Object(Arc::new(1_u8)),
            Properties::new(),
        )
        .unwrap();

    let removed = framework.uninstall_bundle(bundle.id());

    assert!(removed.is_some());
    assert!(!registration.is_registered());
    assert!(framework.get_bundle(bundle.id()).is_none());
}

#[test]
fn Framework___uninstall_system_bundle___is_refused() {
    let framework = Framework::new();

    assert!(framework.uninstall_bundle(0).is_none());
    assert!(framework.system_bundle().is_some());
}
