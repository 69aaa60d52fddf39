//! Stack-disciplined root protection for unmanaged call frames.
//!
//! Native code frequently holds values that are not yet reachable from any
//! managed root (an object under construction, a return value plucked out of
//! the heap). The arena bridges those frames to the collector: a native call
//! opens a frame, protects the values it holds, and releases the frame on
//! every exit path. Protected values are scanned as roots by the marker.

use core_types::{MemoryError, Value};

/// Token naming one open protection frame.
///
/// Frames form a strict stack; the handle is the frame's depth at the time
/// it was opened. Releasing frames out of LIFO order is a protocol
/// violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHandle(usize);

/// One open protection scope and the values registered within it.
#[derive(Debug, Default)]
struct RootFrame {
    values: Vec<Value>,
}

/// The root-protection arena: a stack of frames owned by one VM instance.
#[derive(Debug)]
pub struct RootArena {
    frames: Vec<RootFrame>,
}

impl RootArena {
    /// Creates an arena with room for `initial_capacity` frames before the
    /// stack reallocates.
    pub fn new(initial_capacity: usize) -> Self {
        RootArena {
            frames: Vec::with_capacity(initial_capacity),
        }
    }

    /// Opens a protection frame and returns its handle.
    pub fn push_frame(&mut self) -> FrameHandle {
        self.frames.push(RootFrame::default());
        FrameHandle(self.frames.len() - 1)
    }

    /// Registers `value` as a GC root until the frame named by `handle` is
    /// popped. Immediates are accepted and simply never need scanning.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ProtocolViolation`] when no frame is open or `handle`
    /// does not name an open frame.
    pub fn protect(&mut self, handle: FrameHandle, value: Value) -> Result<(), MemoryError> {
        if self.frames.is_empty() {
            return Err(MemoryError::ProtocolViolation(
                "protect called with no open frame",
            ));
        }
        match self.frames.get_mut(handle.0) {
            Some(frame) => {
                frame.values.push(value);
                Ok(())
            }
            None => Err(MemoryError::ProtocolViolation(
                "protect against a frame that is not open",
            )),
        }
    }

    /// Releases every protection registered since the matching
    /// `push_frame`. Must be called in exact LIFO order.
    ///
    /// # Errors
    ///
    /// [`MemoryError::ProtocolViolation`] when `handle` is not the innermost
    /// open frame.
    pub fn pop_frame(&mut self, handle: FrameHandle) -> Result<(), MemoryError> {
        if self.frames.is_empty() {
            return Err(MemoryError::ProtocolViolation(
                "pop_frame called with no open frame",
            ));
        }
        if handle.0 != self.frames.len() - 1 {
            return Err(MemoryError::ProtocolViolation(
                "frames must be released in LIFO order",
            ));
        }
        self.frames.pop();
        Ok(())
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Total number of protected values across all open frames.
    pub fn protected_count(&self) -> usize {
        self.frames.iter().map(|f| f.values.len()).sum()
    }

    /// Iterates every protected value, outermost frame first.
    pub(crate) fn iter_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.frames.iter().flat_map(|f| f.values.iter().copied())
    }
}
