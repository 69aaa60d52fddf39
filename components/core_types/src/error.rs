//! Memory-management error types.
//!
//! This module provides the error surface shared by the value representation
//! and the garbage collector.

use thiserror::Error;

/// Errors surfaced by the memory manager.
///
/// # Examples
///
/// ```
/// use core_types::{MemoryError, Value};
///
/// let err = Value::encode_fixnum(1).as_object().unwrap_err();
/// assert!(matches!(err, MemoryError::TypeMismatch { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Allocation unsatisfiable even after one synchronous full collection.
    ///
    /// Fatal: the caller must not attempt further allocation on this heap.
    #[error("out of memory: heap at configured maximum and a full collection freed nothing")]
    OutOfMemory,

    /// Root-protection protocol misuse: `protect` with no open frame, or a
    /// frame released out of LIFO order. A native-code programming error,
    /// not locally recoverable.
    #[error("root-protection protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// A heap-object operation was applied to an immediate value.
    /// Recoverable at the call site.
    #[error("type mismatch: expected a heap reference, found {found}")]
    TypeMismatch {
        /// Type name of the value actually supplied.
        found: &'static str,
    },
}
