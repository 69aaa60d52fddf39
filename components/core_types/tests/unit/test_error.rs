//! Unit tests for MemoryError.

use core_types::{MemoryError, Value};

#[test]
fn test_error_variants() {
    let _oom = MemoryError::OutOfMemory;
    let _protocol = MemoryError::ProtocolViolation("pop out of order");
    let _mismatch = MemoryError::TypeMismatch { found: "nil" };
}

#[test]
fn test_type_mismatch_names_the_found_kind() {
    let err = Value::encode_symbol(1).as_object().unwrap_err();
    assert_eq!(err, MemoryError::TypeMismatch { found: "symbol" });
    assert!(err.to_string().contains("symbol"));
}

#[test]
fn test_errors_are_comparable() {
    assert_eq!(MemoryError::OutOfMemory, MemoryError::OutOfMemory);
    assert_ne!(
        MemoryError::OutOfMemory,
        MemoryError::TypeMismatch { found: "nil" }
    );
}
