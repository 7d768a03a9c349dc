#![allow(non_snake_case)]

use super::*;

// LogLevel tests

#[test]
fn LogLevel___ordering___increases_with_severity() {
    assert!(LogLevel::Trace < LogLevel::Debug);
    assert!(LogLevel::Debug < LogLevel::Info);
    assert!(LogLevel::Info < LogLevel::Warn);
    assert!(LogLevel::Warn < LogLevel::Error);
    assert!(LogLevel::Error < LogLevel::Off);
}

#[test]
fn LogLevel___from_u8___maps_known_values() {
    assert_eq!(LogLevel::from_u8(0), LogLevel::Trace);
    assert_eq!(LogLevel::from_u8(2), LogLevel::Info);
    assert_eq!(LogLevel::from_u8(4), LogLevel::Error);
}

#[test]
fn LogLevel___from_u8_out_of_range___returns_off() {
    assert_eq!(LogLevel::from_u8(200), LogLevel::Off);
}

#[test]
fn LogLevel___display___is_uppercase() {
    assert_eq!(LogLevel::Warn.to_string(), "WARN");
}
