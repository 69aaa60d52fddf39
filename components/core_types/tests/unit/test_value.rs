//! Unit tests for the tagged Value representation.

use core_types::{ObjectRef, Value};

mod encoding_tests {
    use super::*;

    #[test]
    fn test_encode_fixnum() {
        let val = Value::encode_fixnum(42);
        assert!(matches!(val, Value::Fixnum(42)));
    }

    #[test]
    fn test_encode_float() {
        let val = Value::encode_float(1.5);
        assert!(matches!(val, Value::Float(f) if f == 1.5));
    }

    #[test]
    fn test_encode_bool() {
        assert!(matches!(Value::encode_bool(true), Value::Bool(true)));
        assert!(matches!(Value::encode_bool(false), Value::Bool(false)));
    }

    #[test]
    fn test_encode_symbol() {
        let val = Value::encode_symbol(9);
        assert_eq!(val.as_symbol(), Some(9));
    }

    #[test]
    fn test_encode_heap_ref() {
        let r = ObjectRef::from_raw_parts(1, 2);
        let val = Value::encode_heap_ref(r);
        assert!(val.is_heap_ref());
        assert_eq!(val.as_object().unwrap(), r);
    }
}

mod decoding_tests {
    use super::*;

    #[test]
    fn test_fixnum_round_trip_extremes() {
        assert_eq!(Value::encode_fixnum(i64::MIN).as_fixnum(), Some(i64::MIN));
        assert_eq!(Value::encode_fixnum(i64::MAX).as_fixnum(), Some(i64::MAX));
    }

    #[test]
    fn test_wrong_kind_decodes_to_none() {
        let val = Value::encode_fixnum(1);
        assert_eq!(val.as_float(), None);
        assert_eq!(val.as_bool(), None);
        assert_eq!(val.as_symbol(), None);
        assert_eq!(val.as_vec3(), None);
    }

    #[test]
    fn test_decoding_never_requires_a_heap() {
        // Immediates decode with no collector in the process at all.
        let vals = [
            Value::Nil,
            Value::encode_bool(true),
            Value::encode_fixnum(-3),
            Value::encode_float(0.25),
            Value::encode_symbol(0),
            Value::encode_vec3(1.0, 2.0, 3.0),
        ];
        for v in vals {
            assert!(v.is_immediate());
        }
    }
}

mod display_tests {
    use super::*;

    #[test]
    fn test_display_basic() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::encode_bool(true).to_string(), "true");
        assert_eq!(Value::encode_fixnum(42).to_string(), "42");
    }

    #[test]
    fn test_display_special_floats() {
        assert_eq!(Value::encode_float(f64::NAN).to_string(), "nan");
        assert_eq!(Value::encode_float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::encode_float(f64::NEG_INFINITY).to_string(), "-inf");
    }
}
