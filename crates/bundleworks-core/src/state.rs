//! Component configuration states exposed to introspection

use serde::{Deserialize, Serialize};

/// Externally visible state of a component configuration
///
/// State transitions:
/// ```text
/// UnsatisfiedReference → Satisfied → Active
///          ↑                 │          │
///          └─────────────────┴──────────┘ (deactivate)
/// ```
///
/// `UnsatisfiedConfiguration` is reported in place of `UnsatisfiedReference`
/// while a component with a `require` configuration policy is missing
/// configuration data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// Waiting for required configuration
    UnsatisfiedConfiguration,
    /// At least one mandatory reference is not satisfied
    #[default]
    UnsatisfiedReference,
    /// All references satisfied; the provided service (if any) is registered
    Satisfied,
    /// A component instance has been created and activated
    Active,
}

impl ComponentState {
    /// Check if a single transition from this state to `target` is allowed
    pub fn can_transition_to(&self, target: ComponentState) -> bool {
        use ComponentState::*;
        matches!(
            (self, target),
            (UnsatisfiedConfiguration, UnsatisfiedReference)
                | (UnsatisfiedConfiguration, Satisfied)
                | (UnsatisfiedReference, UnsatisfiedConfiguration)
                | (UnsatisfiedReference, Satisfied)
                | (Satisfied, Active)
                // Deactivation lands on one of the unsatisfied states
                | (Satisfied | Active, UnsatisfiedReference | UnsatisfiedConfiguration)
        )
    }

    /// Check if all references are satisfied in this state
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ComponentState::Satisfied | ComponentState::Active)
    }

    /// Get a human-readable description of this state
    pub fn description(&self) -> &'static str {
        match self {
            ComponentState::UnsatisfiedConfiguration => "Component is waiting for configuration",
            ComponentState::UnsatisfiedReference => "Component has unsatisfied references",
            ComponentState::Satisfied => "Component is satisfied and its service is registered",
            ComponentState::Active => "Component is active",
        }
    }
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentState::UnsatisfiedConfiguration => write!(f, "UNSATISFIED_CONFIGURATION"),
            ComponentState::UnsatisfiedReference => write!(f, "UNSATISFIED_REFERENCE"),
            ComponentState::Satisfied => write!(f, "SATISFIED"),
            ComponentState::Active => write!(f, "ACTIVE"),
        }
    }
}


#[cfg(test)]
#[path = "state/state_parameterized_tests.rs"]
mod state_parameterized_tests;
