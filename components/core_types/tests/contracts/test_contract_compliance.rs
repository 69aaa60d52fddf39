//! Contract compliance tests for core_types
//!
//! These tests verify that every exported type and operation of the value
//! representation exists with the specified shape.

use core_types::{MemoryError, ObjectRef, PackedVec3, Value};

mod value_contract_tests {
    use super::*;

    /// Contract: Value must have every immediate variant plus a heap handle
    #[test]
    fn test_value_has_all_variants() {
        let _: Value = Value::Nil;
        let _: Value = Value::Bool(true);
        let _: Value = Value::Fixnum(0);
        let _: Value = Value::Float(0.0);
        let _: Value = Value::Symbol(0);
        let _: Value = Value::Vec3(PackedVec3::new(0.0, 0.0, 0.0));
        let _: Value = Value::Ref(ObjectRef::from_raw_parts(0, 0));
    }

    /// Contract: Value is Copy — moving one never touches the heap
    #[test]
    fn test_value_is_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<Value>();
        assert_copy::<ObjectRef>();
        assert_copy::<PackedVec3>();
    }

    /// Contract: is_immediate partitions values exactly
    #[test]
    fn test_is_immediate_partition() {
        assert!(Value::Nil.is_immediate());
        let r = Value::Ref(ObjectRef::from_raw_parts(0, 0));
        assert!(!r.is_immediate());
        assert!(r.is_heap_ref());
    }

    /// Contract: as_object fails with TypeMismatch on immediates
    #[test]
    fn test_as_object_contract() {
        assert!(matches!(
            Value::Nil.as_object(),
            Err(MemoryError::TypeMismatch { .. })
        ));
    }
}

mod object_ref_contract_tests {
    use super::*;

    /// Contract: handles are value types usable as map keys
    #[test]
    fn test_object_ref_is_hashable() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ObjectRef::from_raw_parts(0, 1));
        set.insert(ObjectRef::from_raw_parts(0, 1));
        assert_eq!(set.len(), 1);
    }

    /// Contract: raw parts round-trip
    #[test]
    fn test_object_ref_raw_parts() {
        let r = ObjectRef::from_raw_parts(7, 11);
        assert_eq!(r.page_index(), 7);
        assert_eq!(r.slot_index(), 11);
    }
}

mod packed_vec3_contract_tests {
    use super::*;

    /// Contract: packing is lossy to 1/256 and documented as such
    #[test]
    fn test_declared_precision() {
        let v = PackedVec3::new(0.5, 0.25, 0.125);
        assert_eq!(v.components(), (0.5, 0.25, 0.125));
    }
}
