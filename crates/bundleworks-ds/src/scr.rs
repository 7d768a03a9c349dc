//! Introspection and control of declared components

use crate::component_registry::ComponentRegistry;
use crate::manager::ComponentManager;
use bundleworks_core::{
    ComponentMetadata, ComponentState, FrameworkError, Properties, ReferenceMetadata,
    ReferencePolicy, ReferencePolicyOption, ReferenceScope,
};
use bundleworks_runtime::TransitionFuture;
use serde::Serialize;
use std::sync::Arc;

/// A declared reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDto {
    pub name: String,
    pub interface: String,
    pub cardinality: String,
    pub policy: ReferencePolicy,
    pub policy_option: ReferencePolicyOption,
    pub scope: ReferenceScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl From<&ReferenceMetadata> for ReferenceDto {
    fn from(reference: &ReferenceMetadata) -> Self {
        Self {
            name: reference.name.clone(),
            interface: reference.interface.clone(),
            cardinality: reference.cardinality.to_string(),
            policy: reference.policy,
            policy_option: reference.policy_option,
            scope: reference.scope,
            target: reference.target.clone(),
        }
    }
}

/// A declared component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptionDto {
    pub name: String,
    pub implementation_class: String,
    pub bundle_id: u64,
    pub default_enabled: bool,
    pub immediate: bool,
    pub service_interfaces: Vec<String>,
    pub properties: Properties,
    pub references: Vec<ReferenceDto>,
}

impl ComponentDescriptionDto {
    fn new(bundle_id: u64, metadata: &ComponentMetadata) -> Self {
        Self {
            name: metadata.name.clone(),
            implementation_class: metadata.implementation_class.clone(),
            bundle_id,
            default_enabled: metadata.enabled,
            immediate: metadata.immediate,
            service_interfaces: metadata.service_interfaces().to_vec(),
            properties: metadata.properties.clone(),
            references: metadata.references.iter().map(ReferenceDto::from).collect(),
        }
    }
}

/// A reference with enough bound services
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SatisfiedReferenceDto {
    pub name: String,
    pub target: String,
    pub bound_services: Vec<u64>,
}

/// A reference still waiting for services
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsatisfiedReferenceDto {
    pub name: String,
    pub target: String,
    pub target_services: Vec<u64>,
}

/// A live component configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfigurationDto {
    pub id: u64,
    pub state: ComponentState,
    pub description: ComponentDescriptionDto,
    pub properties: Properties,
    pub satisfied_references: Vec<SatisfiedReferenceDto>,
    pub unsatisfied_references: Vec<UnsatisfiedReferenceDto>,
}

/// Read and change the state of declared components at runtime
#[derive(Debug, Clone)]
pub struct ServiceComponentRuntime {
    registry: Arc<ComponentRegistry>,
}

impl ServiceComponentRuntime {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    /// Descriptions declared by `bundle_ids`, or by every bundle if empty
    pub fn get_component_description_dtos(&self, bundle_ids: &[u64]) -> Vec<ComponentDescriptionDto> {
        let managers = if bundle_ids.is_empty() {
            self.registry.get_component_managers()
        } else {
            bundle_ids
                .iter()
                .flat_map(|id| self.registry.get_component_managers_for(*id))
                .collect()
        };
        managers.iter().map(|m| describe(m)).collect()
    }

    pub fn get_component_description_dto(
        &self,
        bundle_id: u64,
        name: &str,
    ) -> Option<ComponentDescriptionDto> {
        self.registry
            .get_component_manager(bundle_id, name)
            .map(|m| describe(&m))
    }

    /// Configurations of an enabled component; empty when disabled
    pub fn get_component_configuration_dtos(
        &self,
        description: &ComponentDescriptionDto,
    ) -> Vec<ComponentConfigurationDto> {
        let Some(manager) = self.manager_for(description) else {
            return Vec::new();
        };
        manager
            .get_component_configurations()
            .iter()
            .map(|configuration| {
                let mut satisfied_references = Vec::new();
                let mut unsatisfied_references = Vec::new();
                for reference in configuration.get_all_dependency_managers() {
                    if reference.is_satisfied() {
                        satisfied_references.push(SatisfiedReferenceDto {
                            name: reference.get_reference_name().to_string(),
                            target: reference.get_ldap_string(),
                            bound_services: reference
                                .get_bound_references()
                                .iter()
                                .map(|r| r.id())
                                .collect(),
                        });
                    } else {
                        unsatisfied_references.push(UnsatisfiedReferenceDto {
                            name: reference.get_reference_name().to_string(),
                            target: reference.get_ldap_string(),
                            target_services: reference
                                .get_target_references()
                                .iter()
                                .map(|r| r.id())
                                .collect(),
                        });
                    }
                }
                ComponentConfigurationDto {
                    id: configuration.get_id(),
                    state: configuration.get_config_state(),
                    description: describe(&manager),
                    properties: configuration.get_properties(),
                    satisfied_references,
                    unsatisfied_references,
                }
            })
            .collect()
    }

    pub fn is_component_enabled(&self, description: &ComponentDescriptionDto) -> bool {
        self.manager_for(description)
            .is_some_and(|manager| manager.is_enabled())
    }

    /// Enable a component; the future fails if it is not known
    pub fn enable_component(&self, description: &ComponentDescriptionDto) -> TransitionFuture {
        match self.manager_for(description) {
            Some(manager) => manager.enable(),
            None => unknown(description),
        }
    }

    /// Disable a component; the future fails if it is not known
    pub fn disable_component(&self, description: &ComponentDescriptionDto) -> TransitionFuture {
        match self.manager_for(description) {
            Some(manager) => manager.disable(),
            None => unknown(description),
        }
    }

    fn manager_for(&self, description: &ComponentDescriptionDto) -> Option<Arc<ComponentManager>> {
        self.registry
            .get_component_manager(description.bundle_id, &description.name)
    }
}

fn describe(manager: &ComponentManager) -> ComponentDescriptionDto {
    ComponentDescriptionDto::new(manager.get_bundle_id(), manager.get_metadata())
}

fn unknown(description: &ComponentDescriptionDto) -> TransitionFuture {
    TransitionFuture::completed(Err(FrameworkError::InvalidArgument(format!(
        "bundle {} declares no component named '{}'",
        description.bundle_id, description.name
    ))))
}
