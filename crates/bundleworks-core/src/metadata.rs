//! Component descriptions
//!
//! Descriptions are parsed from the `scr` section of a bundle manifest and are
//! immutable afterwards. They are shared read-only by every manager and
//! configuration derived from them.

use crate::error::{FrameworkError, FrameworkResult};
use crate::properties::Properties;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Only manifest version understood by this runtime
pub const SCR_MANIFEST_VERSION: u32 = 1;

/// Bounds on how many services may be bound to a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cardinality {
    min: usize,
    max: usize,
}

impl Cardinality {
    /// `0..1`
    pub const OPTIONAL_UNARY: Cardinality = Cardinality { min: 0, max: 1 };
    /// `1..1`
    pub const MANDATORY_UNARY: Cardinality = Cardinality { min: 1, max: 1 };
    /// `0..n`
    pub const OPTIONAL_MULTIPLE: Cardinality = Cardinality {
        min: 0,
        max: usize::MAX,
    };
    /// `1..n`
    pub const MANDATORY_MULTIPLE: Cardinality = Cardinality {
        min: 1,
        max: usize::MAX,
    };

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    pub fn is_multiple(&self) -> bool {
        self.max > 1
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::MANDATORY_UNARY
    }
}

impl FromStr for Cardinality {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0..1" => Ok(Cardinality::OPTIONAL_UNARY),
            "1..1" => Ok(Cardinality::MANDATORY_UNARY),
            "0..n" => Ok(Cardinality::OPTIONAL_MULTIPLE),
            "1..n" => Ok(Cardinality::MANDATORY_MULTIPLE),
            other => Err(FrameworkError::Metadata(format!(
                "invalid cardinality '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Cardinality {
    type Error = FrameworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cardinality> for String {
    fn from(value: Cardinality) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.max == usize::MAX {
            write!(f, "{}..n", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

/// Whether a bound service may change while the component stays active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Any change to the bound set deactivates and reactivates the component
    #[default]
    Static,
    /// Bound services are swapped on the live instance
    Dynamic,
}

/// Whether a better candidate displaces an existing binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicyOption {
    /// Keep the existing binding until it goes away
    #[default]
    Reluctant,
    /// Always move to the best available candidate
    Greedy,
}

/// How service objects are obtained for a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceScope {
    #[default]
    Bundle,
    Prototype,
    PrototypeRequired,
}

/// Scope of a provided service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    #[default]
    Singleton,
    Bundle,
    Prototype,
}

impl std::fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceScope::Singleton => write!(f, "singleton"),
            ServiceScope::Bundle => write!(f, "bundle"),
            ServiceScope::Prototype => write!(f, "prototype"),
        }
    }
}

/// How a component depends on Configuration Admin data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationPolicy {
    /// Configuration data is never consulted
    #[default]
    Ignore,
    /// Configuration data is merged in when present
    Optional,
    /// The component stays unsatisfied until every configuration pid has data
    Require,
}

/// Stands for the component's own name in `configuration-pid`
pub const COMPONENT_NAME_PID: &str = "$";

/// A declared dependency on a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReferenceMetadata {
    pub name: String,
    pub interface: String,
    /// Additional LDAP filter applied on top of the interface match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub policy: ReferencePolicy,
    #[serde(default)]
    pub policy_option: ReferencePolicyOption,
    #[serde(default)]
    pub scope: ReferenceScope,
}

impl ReferenceMetadata {
    /// Create a mandatory, static, reluctant reference
    pub fn new(name: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: interface.into(),
            target: None,
            cardinality: Cardinality::default(),
            policy: ReferencePolicy::default(),
            policy_option: ReferencePolicyOption::default(),
            scope: ReferenceScope::default(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_policy_option(mut self, option: ReferencePolicyOption) -> Self {
        self.policy_option = option;
        self
    }
}

/// Interfaces provided by a component
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub scope: ServiceScope,
}

/// Immutable description of one component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "RawComponentMetadata")]
pub struct ComponentMetadata {
    pub name: String,
    pub implementation_class: String,
    pub enabled: bool,
    pub immediate: bool,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceMetadata>,
    pub references: Vec<ReferenceMetadata>,
    pub configuration_policy: ConfigurationPolicy,
    #[serde(rename = "configuration-pid")]
    pub configuration_pids: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawComponentMetadata {
    implementation_class: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    immediate: Option<bool>,
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    service: Option<ServiceMetadata>,
    #[serde(default)]
    references: Vec<ReferenceMetadata>,
    #[serde(default)]
    configuration_policy: Option<ConfigurationPolicy>,
    #[serde(default)]
    configuration_pid: Option<Vec<String>>,
}

impl TryFrom<RawComponentMetadata> for ComponentMetadata {
    type Error = FrameworkError;

    fn try_from(raw: RawComponentMetadata) -> Result<Self, Self::Error> {
        let provides_service = raw.service.is_some();
        // Components without a service have no other trigger for activation.
        let immediate = raw.immediate.unwrap_or(!provides_service);
        if !provides_service && !immediate {
            return Err(FrameworkError::Metadata(format!(
                "component '{}' provides no service and cannot be delayed",
                raw.name.as_deref().unwrap_or(&raw.implementation_class)
            )));
        }

        let name = raw
            .name
            .unwrap_or_else(|| raw.implementation_class.clone());
        let (configuration_policy, configuration_pids) =
            match (raw.configuration_policy, raw.configuration_pid) {
                (None, None) => (ConfigurationPolicy::Ignore, Vec::new()),
                (Some(policy), Some(pids)) if policy != ConfigurationPolicy::Ignore => {
                    let pids = pids
                        .into_iter()
                        .map(|pid| if pid == COMPONENT_NAME_PID { name.clone() } else { pid })
                        .collect();
                    (policy, pids)
                }
                (Some(_), Some(_)) => (ConfigurationPolicy::Ignore, Vec::new()),
                (policy, pids) => {
                    tracing::warn!(
                        component = %name,
                        policy = ?policy,
                        pids = ?pids,
                        "configuration-policy and configuration-pid must be given together, ignoring configuration"
                    );
                    (ConfigurationPolicy::Ignore, Vec::new())
                }
            };

        let metadata = ComponentMetadata {
            name,
            implementation_class: raw.implementation_class,
            enabled: raw.enabled,
            immediate,
            properties: raw.properties,
            service: raw.service,
            references: raw.references,
            configuration_policy,
            configuration_pids,
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

impl ComponentMetadata {
    /// Create an enabled, immediate component with no service and no references
    pub fn new(implementation_class: impl Into<String>) -> Self {
        let implementation_class = implementation_class.into();
        Self {
            name: implementation_class.clone(),
            implementation_class,
            enabled: true,
            immediate: true,
            properties: Properties::new(),
            service: None,
            references: Vec::new(),
            configuration_policy: ConfigurationPolicy::Ignore,
            configuration_pids: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Provide a singleton service. Like parsed descriptions, components that
    /// provide a service are delayed unless `with_immediate(true)` follows.
    pub fn with_service<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service = Some(ServiceMetadata {
            interfaces: interfaces.into_iter().map(Into::into).collect(),
            scope: ServiceScope::Singleton,
        });
        self.immediate = false;
        self
    }

    /// Change the scope of the service set by `with_service`
    pub fn with_scope(mut self, scope: ServiceScope) -> Self {
        if let Some(service) = &mut self.service {
            service.scope = scope;
        }
        self
    }

    pub fn with_reference(mut self, reference: ReferenceMetadata) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Depend on Configuration Admin data under `pids`
    ///
    /// `$` stands for the component name as set so far.
    pub fn with_configuration<I, S>(mut self, policy: ConfigurationPolicy, pids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = self.name.clone();
        self.configuration_policy = policy;
        self.configuration_pids = pids
            .into_iter()
            .map(Into::into)
            .map(|pid| if pid == COMPONENT_NAME_PID { name.clone() } else { pid })
            .collect();
        self
    }

    /// Whether configuration data gates or feeds this component
    pub fn uses_configuration(&self) -> bool {
        self.configuration_policy != ConfigurationPolicy::Ignore
            && !self.configuration_pids.is_empty()
    }

    /// Interfaces of the provided service, empty when none is provided
    pub fn service_interfaces(&self) -> &[String] {
        self.service
            .as_ref()
            .map(|s| s.interfaces.as_slice())
            .unwrap_or_default()
    }

    /// Look up a reference description by name
    pub fn reference(&self, name: &str) -> Option<&ReferenceMetadata> {
        self.references.iter().find(|r| r.name == name)
    }

    /// Check structural invariants of the description
    pub fn validate(&self) -> FrameworkResult<()> {
        if self.implementation_class.trim().is_empty() {
            return Err(FrameworkError::Metadata(
                "implementation-class must not be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(FrameworkError::Metadata(
                "component name must not be empty".to_string(),
            ));
        }
        if let Some(service) = &self.service
            && service.interfaces.is_empty()
        {
            return Err(FrameworkError::Metadata(format!(
                "component '{}' declares a service without interfaces",
                self.name
            )));
        }

        let mut pids = HashSet::new();
        for pid in &self.configuration_pids {
            if pid.trim().is_empty() || !pids.insert(pid.as_str()) {
                return Err(FrameworkError::Metadata(format!(
                    "component '{}' has an empty or repeated configuration pid '{pid}'",
                    self.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for reference in &self.references {
            if reference.name.trim().is_empty() || reference.interface.trim().is_empty() {
                return Err(FrameworkError::Metadata(format!(
                    "component '{}' has a reference without name or interface",
                    self.name
                )));
            }
            if !seen.insert(reference.name.as_str()) {
                return Err(FrameworkError::Metadata(format!(
                    "component '{}' declares reference '{}' twice",
                    self.name, reference.name
                )));
            }
        }
        Ok(())
    }

    /// Parse a single component description from JSON bytes
    pub fn from_json(bytes: &[u8]) -> FrameworkResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The `scr` section of a bundle manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrManifest {
    pub version: u32,
    #[serde(default)]
    pub components: Vec<ComponentMetadata>,
}

impl ScrManifest {
    /// Parse a manifest section from JSON bytes
    pub fn from_json(bytes: &[u8]) -> FrameworkResult<Self> {
        let manifest: ScrManifest = serde_json::from_slice(bytes)?;
        manifest.check_version()?;
        Ok(manifest)
    }

    /// Parse a manifest section from an already decoded JSON value
    pub fn from_value(value: serde_json::Value) -> FrameworkResult<Self> {
        let manifest: ScrManifest = serde_json::from_value(value)?;
        manifest.check_version()?;
        Ok(manifest)
    }

    fn check_version(&self) -> FrameworkResult<()> {
        if self.version != SCR_MANIFEST_VERSION {
            return Err(FrameworkError::Metadata(format!(
                "unsupported scr manifest version {}",
                self.version
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "metadata/metadata_tests.rs"]
mod metadata_tests;
