#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

// ============================================================================
// Parameterized valid transitions
// ============================================================================

#[test_case(ComponentState::UnsatisfiedConfiguration, ComponentState::UnsatisfiedReference)]
#[test_case(ComponentState::UnsatisfiedConfiguration, ComponentState::Satisfied)]
#[test_case(ComponentState::UnsatisfiedReference, ComponentState::UnsatisfiedConfiguration)]
#[test_case(ComponentState::UnsatisfiedReference, ComponentState::Satisfied)]
#[test_case(ComponentState::Satisfied, ComponentState::Active)]
#[test_case(ComponentState::Satisfied, ComponentState::UnsatisfiedReference)]
#[test_case(ComponentState::Active, ComponentState::UnsatisfiedReference)]
#[test_case(ComponentState::Active, ComponentState::UnsatisfiedConfiguration)]
fn ComponentState___valid_transitions___allowed(from: ComponentState, to: ComponentState) {
    assert!(
        from.can_transition_to(to),
        "{:?} should transition to {:?}",
        from,
        to
    );
}

// ============================================================================
// Parameterized invalid transitions
// ============================================================================

#[test_case(ComponentState::UnsatisfiedReference, ComponentState::Active)]
#[test_case(ComponentState::Active, ComponentState::Satisfied)]
#[test_case(ComponentState::UnsatisfiedConfiguration, ComponentState::Active)]
#[test_case(ComponentState::Active, ComponentState::Active)]
#[test_case(ComponentState::Satisfied, ComponentState::Satisfied)]
fn ComponentState___invalid_transitions___not_allowed(from: ComponentState, to: ComponentState) {
    assert!(
        !from.can_transition_to(to),
        "{:?} should not transition to {:?}",
        from,
        to
    );
}

#[test_case(ComponentState::UnsatisfiedConfiguration, false)]
#[test_case(ComponentState::UnsatisfiedReference, false)]
#[test_case(ComponentState::Satisfied, true)]
#[test_case(ComponentState::Active, true)]
fn ComponentState___is_satisfied___matches_state(state: ComponentState, expected: bool) {
    assert_eq!(state.is_satisfied(), expected);
}
