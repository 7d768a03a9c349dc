#![allow(non_snake_case)]

use super::*;
use serde_json::json;

#[test]
fn ComponentMetadata___from_json_minimal___applies_defaults() {
    let json = br#"{ "implementation-class": "sample::Clock" }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    assert_eq!(metadata.name, "sample::Clock");
    assert!(metadata.enabled);
    assert!(metadata.immediate);
    assert!(metadata.service.is_none());
    assert!(metadata.references.is_empty());
}

#[test]
fn ComponentMetadata___from_json_with_service___is_delayed_by_default() {
    let json = br#"{
        "implementation-class": "sample::Greeter",
        "service": { "interfaces": ["sample::Greeting"] }
    }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    assert!(!metadata.immediate);
    assert_eq!(metadata.service_interfaces(), ["sample::Greeting".to_string()]);
    assert_eq!(metadata.service.unwrap().scope, ServiceScope::Singleton);
}

#[test]
fn ComponentMetadata___from_json_full___parses_references() {
    let json = br#"{
        "implementation-class": "sample::Printer",
        "name": "printer",
        "enabled": false,
        "immediate": true,
        "properties": { "color": true },
        "service": { "interfaces": ["sample::Print"], "scope": "singleton" },
        "references": [
            {
                "name": "spool",
                "interface": "sample::Spool",
                "cardinality": "0..n",
                "policy": "dynamic",
                "policy-option": "greedy",
                "target": "(region=eu)"
            }
        ]
    }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    assert_eq!(metadata.name, "printer");
    assert!(!metadata.enabled);
    assert!(metadata.immediate);
    assert_eq!(metadata.properties.get("color"), Some(&json!(true)));
    let spool = metadata.reference("spool").unwrap();
    assert_eq!(spool.cardinality, Cardinality::OPTIONAL_MULTIPLE);
    assert_eq!(spool.policy, ReferencePolicy::Dynamic);
    assert_eq!(spool.policy_option, ReferencePolicyOption::Greedy);
    assert_eq!(spool.target.as_deref(), Some("(region=eu)"));
}

#[test]
fn ComponentMetadata___reference_defaults___are_static_reluctant_mandatory() {
    let json = br#"{
        "implementation-class": "sample::Printer",
        "references": [ { "name": "spool", "interface": "sample::Spool" } ]
    }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    let spool = &metadata.references[0];
    assert_eq!(spool.cardinality, Cardinality::MANDATORY_UNARY);
    assert_eq!(spool.policy, ReferencePolicy::Static);
    assert_eq!(spool.policy_option, ReferencePolicyOption::Reluctant);
    assert_eq!(spool.scope, ReferenceScope::Bundle);
    assert!(spool.target.is_none());
}

#[test]
fn ComponentMetadata___delayed_without_service___is_rejected() {
    let json = br#"{ "implementation-class": "sample::Clock", "immediate": false }"#;

    let result = ComponentMetadata::from_json(json);

    assert!(matches!(result, Err(FrameworkError::Metadata(_))));
}

#[test]
fn ComponentMetadata___duplicate_reference_names___are_rejected() {
    let json = br#"{
        "implementation-class": "sample::Printer",
        "references": [
            { "name": "spool", "interface": "sample::Spool" },
            { "name": "spool", "interface": "sample::Other" }
        ]
    }"#;

    let result = ComponentMetadata::from_json(json);

    assert!(matches!(result, Err(FrameworkError::Metadata(_))));
}

#[test]
fn ComponentMetadata___service_without_interfaces___is_rejected() {
    let json = br#"{
        "implementation-class": "sample::Printer",
        "service": { "interfaces": [] }
    }"#;

    let result = ComponentMetadata::from_json(json);

    assert!(matches!(result, Err(FrameworkError::Metadata(_))));
}

#[test]
fn ComponentMetadata___missing_implementation_class___is_rejected() {
    let result = ComponentMetadata::from_json(br#"{ "name": "orphan" }"#);

    assert!(result.is_err());
}

#[test]
fn ComponentMetadata___builder___mirrors_parsed_defaults() {
    let metadata = ComponentMetadata::new("sample::Greeter")
        .with_service(["sample::Greeting"])
        .with_reference(ReferenceMetadata::new("clock", "sample::Clock"));

    assert_eq!(metadata.name, "sample::Greeter");
    assert!(!metadata.immediate);
    assert!(metadata.enabled);
    assert!(metadata.validate().is_ok());
}

#[test]
fn ComponentMetadata___with_scope___changes_service_scope() {
    let metadata = ComponentMetadata::new("sample::Greeter")
        .with_service(["sample::Greeting"])
        .with_scope(ServiceScope::Bundle);

    assert_eq!(metadata.service.unwrap().scope, ServiceScope::Bundle);
}

#[test]
fn ComponentMetadata___serialize_then_parse___keeps_fields() {
    let metadata = ComponentMetadata::new("sample::Greeter")
        .with_name("greeter")
        .with_service(["sample::Greeting"])
        .with_property("lang", json!("en"))
        .with_reference(
            ReferenceMetadata::new("clock", "sample::Clock")
                .with_cardinality(Cardinality::OPTIONAL_UNARY)
                .with_policy_option(ReferencePolicyOption::Greedy),
        );

    let bytes = serde_json::to_vec(&metadata).unwrap();
    let parsed = ComponentMetadata::from_json(&bytes).unwrap();

    assert_eq!(parsed, metadata);
}

#[test]
fn ScrManifest___from_json___parses_components() {
    let json = br#"{
        "version": 1,
        "components": [
            { "implementation-class": "sample::A" },
            { "implementation-class": "sample::B", "service": { "interfaces": ["sample::B"] } }
        ]
    }"#;

    let manifest = ScrManifest::from_json(json).unwrap();

    assert_eq!(manifest.components.len(), 2);
    assert_eq!(manifest.components[1].name, "sample::B");
}

#[test]
fn ScrManifest___unsupported_version___is_rejected() {
    let result = ScrManifest::from_value(json!({ "version": 2, "components": [] }));

    assert!(matches!(result, Err(FrameworkError::Metadata(_))));
}

// configuration policy

#[test]
fn ComponentMetadata___configuration_defaults___ignore_policy() {
    let metadata = ComponentMetadata::from_json(br#"{ "implementation-class": "sample::Clock" }"#)
        .unwrap();

    assert_eq!(metadata.configuration_policy, ConfigurationPolicy::Ignore);
    assert!(metadata.configuration_pids.is_empty());
    assert!(!metadata.uses_configuration());
}

#[test]
fn ComponentMetadata___configuration_pid_dollar___becomes_component_name() {
    let json = br#"{
        "implementation-class": "sample::Clock",
        "name": "clock",
        "configuration-policy": "require",
        "configuration-pid": ["$", "shared.settings"]
    }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    assert_eq!(metadata.configuration_policy, ConfigurationPolicy::Require);
    assert_eq!(metadata.configuration_pids, vec!["clock", "shared.settings"]);
    assert!(metadata.uses_configuration());
}

#[test]
fn ComponentMetadata___policy_without_pid___falls_back_to_ignore() {
    let json = br#"{
        "implementation-class": "sample::Clock",
        "configuration-policy": "require"
    }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    assert_eq!(metadata.configuration_policy, ConfigurationPolicy::Ignore);
    assert!(metadata.configuration_pids.is_empty());
}

#[test]
fn ComponentMetadata___ignore_policy___drops_pids() {
    let json = br#"{
        "implementation-class": "sample::Clock",
        "configuration-policy": "ignore",
        "configuration-pid": ["clock"]
    }"#;

    let metadata = ComponentMetadata::from_json(json).unwrap();

    assert!(metadata.configuration_pids.is_empty());
}

#[test]
fn ComponentMetadata___repeated_configuration_pid___is_rejected() {
    let json = br#"{
        "implementation-class": "sample::Clock",
        "name": "clock",
        "configuration-policy": "optional",
        "configuration-pid": ["$", "clock"]
    }"#;

    let result = ComponentMetadata::from_json(json);

    assert!(matches!(result, Err(FrameworkError::Metadata(_))));
}

#[test]
fn ComponentMetadata___with_configuration___substitutes_name() {
    let metadata = ComponentMetadata::new("sample::Clock")
        .with_name("clock")
        .with_configuration(ConfigurationPolicy::Optional, ["$"]);

    assert_eq!(metadata.configuration_pids, vec!["clock"]);
    assert!(metadata.validate().is_ok());
}
