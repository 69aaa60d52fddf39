//! Core script value types and error handling.
//!
//! This crate provides the foundational types for the Basalt runtime:
//! the tagged value representation, heap-object handles, and the shared
//! memory-management error type.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of script values
//! - [`ObjectRef`] - Opaque, stable handle to a heap object
//! - [`PackedVec3`] - Fixed-point packed vector immediate
//! - [`MemoryError`] - Allocation, protocol and type errors
//!
//! # Examples
//!
//! ```
//! use core_types::Value;
//!
//! let n = Value::encode_fixnum(42);
//! assert!(n.is_truthy());
//! assert_eq!(n.type_name(), "fixnum");
//!
//! let v = Value::encode_vec3(1.0, 0.5, -2.0);
//! assert!(v.is_immediate());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::MemoryError;
pub use value::{ObjectRef, PackedVec3, Value};
