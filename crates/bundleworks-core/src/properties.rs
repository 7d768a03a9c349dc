//! Service and component property maps

use std::collections::BTreeMap;

/// Property map attached to services and components
pub type Properties = BTreeMap<String, serde_json::Value>;

/// Interfaces a service is registered under
pub const OBJECTCLASS: &str = "objectclass";
/// Framework-assigned service id
pub const SERVICE_ID: &str = "service.id";
/// Service ranking used to pick among candidates
pub const SERVICE_RANKING: &str = "service.ranking";
/// Service scope (`singleton`, `bundle`, `prototype`)
pub const SERVICE_SCOPE: &str = "service.scope";
/// Name of the component that published a service
pub const COMPONENT_NAME: &str = "component.name";
/// Id of the component configuration that published a service
pub const COMPONENT_ID: &str = "component.id";

/// Read `service.ranking`, treating missing or non-integer values as 0
pub fn ranking(properties: &Properties) -> i64 {
    properties
        .get(SERVICE_RANKING)
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(0)
}

/// Read a string property
pub fn string_property<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties.get(key).and_then(serde_json::Value::as_str)
}

#[cfg(test)]
#[path = "properties/properties_tests.rs"]
mod properties_tests;
