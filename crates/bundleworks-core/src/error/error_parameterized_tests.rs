#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

// ============================================================================
// Parameterized error code mapping tests
// ============================================================================

#[test_case(FrameworkError::InvalidArgument("test".into()), 1 ; "invalid_argument")]
#[test_case(FrameworkError::SharedLibrary("test".into()), 2 ; "shared_library")]
#[test_case(FrameworkError::ComponentFailure("test".into()), 3 ; "component_failure")]
#[test_case(FrameworkError::ServiceRegistration("test".into()), 4 ; "service_registration")]
#[test_case(FrameworkError::InvalidFilter("test".into()), 5 ; "invalid_filter")]
#[test_case(FrameworkError::Metadata("test".into()), 6 ; "metadata")]
#[test_case(FrameworkError::RuntimeError("test".into()), 7 ; "runtime_error")]
#[test_case(FrameworkError::Cancelled, 8 ; "cancelled")]
#[test_case(FrameworkError::Timeout, 9 ; "timeout")]
#[test_case(FrameworkError::Internal("test".into()), 10 ; "internal")]
fn FrameworkError___variant___maps_to_correct_code(error: FrameworkError, expected_code: u32) {
    assert_eq!(error.error_code(), expected_code);
}

// ============================================================================
// Parameterized code round trip
// ============================================================================

#[test_case(1)]
#[test_case(2)]
#[test_case(3)]
#[test_case(4)]
#[test_case(5)]
#[test_case(6)]
#[test_case(7)]
#[test_case(8)]
#[test_case(9)]
#[test_case(10)]
fn FrameworkError___from_code___preserves_code(code: u32) {
    let err = FrameworkError::from_code(code, "message".into());

    assert_eq!(err.error_code(), code);
}
