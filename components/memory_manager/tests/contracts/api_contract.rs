//! Contract tests verifying the memory_manager API matches the contract specification.
//! These tests ensure all exported types and functions exist with correct signatures.

use core_types::{MemoryError, Value};
use memory_manager::{Gc, GcConfig, GcPhase, Generation, SizeClass, TypeTag};

/// Test Gc contract: new(config: GcConfig) -> Self
#[test]
fn contract_gc_new() {
    let gc = Gc::new(GcConfig::default());
    assert_eq!(gc.phase(), GcPhase::Idle);
}

/// Test Gc contract: allocate(tag: TypeTag, class: SizeClass) -> Result<ObjectRef, MemoryError>
#[test]
fn contract_gc_allocate() {
    let mut gc = Gc::new(GcConfig::default());
    let r = gc.allocate(TypeTag::Record, SizeClass::Tiny).unwrap();
    assert!(gc.is_live(r));
    assert_eq!(gc.tag_of(r), TypeTag::Record);
    assert_eq!(gc.generation_of(r), Generation::Young);
}

/// Test Gc contract: field/set_field round trip through the barrier
#[test]
fn contract_gc_field_access() {
    let mut gc = Gc::new(GcConfig::default());
    let r = gc.allocate(TypeTag::Record, SizeClass::Tiny).unwrap();
    assert_eq!(gc.field(r, 0), Value::Nil);
    gc.set_field(r, 0, Value::encode_fixnum(5));
    assert_eq!(gc.field(r, 0), Value::encode_fixnum(5));
}

/// Test Gc contract: step_budget(nanoseconds) -> objects_processed,
/// idempotent no-op when idle with no growth pressure
#[test]
fn contract_gc_step_budget_idle_noop() {
    let mut gc = Gc::new(GcConfig::default());
    assert_eq!(gc.step_budget(1_000_000), 0);
    assert_eq!(gc.step_budget(1_000_000), 0);
}

/// Test Gc contract: full_collect() runs a complete cycle synchronously
#[test]
fn contract_gc_full_collect() {
    let mut gc = Gc::new(GcConfig::default());
    let _ = gc.allocate(TypeTag::Record, SizeClass::Tiny).unwrap();
    gc.full_collect();
    assert_eq!(gc.phase(), GcPhase::Idle);
    assert_eq!(gc.stats().major_cycles, 1);
}

/// Test Gc contract: push_frame() -> FrameHandle / protect / pop_frame
#[test]
fn contract_gc_root_protection() {
    let mut gc = Gc::new(GcConfig::default());
    let frame = gc.push_frame();
    let r = gc.allocate(TypeTag::Record, SizeClass::Tiny).unwrap();
    gc.protect(frame, Value::encode_heap_ref(r)).unwrap();
    gc.pop_frame(frame).unwrap();
}

/// Test contract: protect with no open frame is a ProtocolViolation
#[test]
fn contract_protect_without_frame() {
    let mut gc = Gc::new(GcConfig::default());
    let frame = gc.push_frame();
    gc.pop_frame(frame).unwrap();
    let err = gc.protect(frame, Value::encode_fixnum(1)).unwrap_err();
    assert!(matches!(err, MemoryError::ProtocolViolation(_)));
}

/// Test contract: pop_frame out of LIFO order is a ProtocolViolation
#[test]
fn contract_pop_frame_out_of_order() {
    let mut gc = Gc::new(GcConfig::default());
    let outer = gc.push_frame();
    let _inner = gc.push_frame();
    let err = gc.pop_frame(outer).unwrap_err();
    assert!(matches!(err, MemoryError::ProtocolViolation(_)));
}

/// Test contract: as_object on an immediate is a TypeMismatch
#[test]
fn contract_as_object_type_mismatch() {
    let err = Value::encode_float(1.5).as_object().unwrap_err();
    assert!(matches!(err, MemoryError::TypeMismatch { .. }));
}

/// Test contract: on_field_write(owner, value) is exposed for native glue
#[test]
fn contract_on_field_write() {
    let mut gc = Gc::new(GcConfig::default());
    let r = gc.allocate(TypeTag::Record, SizeClass::Tiny).unwrap();
    gc.on_field_write(r, Value::encode_fixnum(1));
    assert_eq!(gc.barrier_log_len(), 0);
}

/// Test contract: configuration is immutable and readable after creation
#[test]
fn contract_config_access() {
    let config = GcConfig {
        interval_ratio: 150,
        ..GcConfig::default()
    };
    let gc = Gc::new(config);
    assert_eq!(gc.config().interval_ratio, 150);
}

/// Test contract: introspection accessors exist
#[test]
fn contract_introspection() {
    let mut gc = Gc::new(GcConfig::default());
    let _ = gc.allocate(TypeTag::List, SizeClass::Medium).unwrap();
    assert!(gc.live_objects() >= 1);
    assert!(gc.committed_pages() >= 1);
    assert!(gc.committed_bytes() >= gc.config().page_size);
}
