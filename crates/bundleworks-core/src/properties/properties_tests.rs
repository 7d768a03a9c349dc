#![allow(non_snake_case)]

use super::*;
use serde_json::json;

#[test]
fn ranking___missing___defaults_to_zero() {
    let props = Properties::new();

    assert_eq!(ranking(&props), 0);
}

#[test]
fn ranking___integer_value___returns_value() {
    let mut props = Properties::new();
    props.insert(SERVICE_RANKING.into(), json!(-7));

    assert_eq!(ranking(&props), -7);
}

#[test]
fn ranking___non_integer_value___defaults_to_zero() {
    let mut props = Properties::new();
    props.insert(SERVICE_RANKING.into(), json!("high"));

    assert_eq!(ranking(&props), 0);
}

#[test]
fn string_property___present___returns_str() {
    let mut props = Properties::new();
    props.insert(COMPONENT_NAME.into(), json!("sample::Greeter"));

    assert_eq!(string_property(&props, COMPONENT_NAME), Some("sample::Greeter"));
    assert_eq!(string_property(&props, COMPONENT_ID), None);
}
