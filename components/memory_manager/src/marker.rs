//! Incremental tri-color mark engine.
//!
//! The marker owns the gray queue: objects reached but not yet scanned.
//! `step` is resumable — it processes a bounded number of objects and
//! returns, leaving the queue as the stored continuation. Order of the
//! queue is irrelevant to correctness, so a plain stack is used.

use crate::heap::{Color, ObjectHeap};
use core_types::{ObjectRef, Value};

#[derive(Debug, Default)]
pub(crate) struct Marker {
    gray: Vec<ObjectRef>,
}

impl Marker {
    pub(crate) fn new() -> Self {
        Marker { gray: Vec::new() }
    }

    /// Shades a white object gray and queues it for scanning. Gray and
    /// black objects are left alone, which is what makes minor cycles stop
    /// at the (black) old generation.
    pub(crate) fn shade(&mut self, heap: &mut ObjectHeap, r: ObjectRef) {
        let header = heap.header_mut(r);
        if header.color == Color::White {
            header.color = Color::Gray;
            self.gray.push(r);
        }
    }

    /// Shades the referent of a heap-reference value; immediates need no
    /// marking.
    pub(crate) fn shade_value(&mut self, heap: &mut ObjectHeap, value: Value) {
        if let Value::Ref(r) = value {
            self.shade(heap, r);
        }
    }

    /// Queues a barrier-logged owner for (re)scanning regardless of its
    /// current color. Logged owners are usually already black from an
    /// earlier cycle; their young referents are what the rescan discovers.
    pub(crate) fn enqueue_logged(&mut self, heap: &mut ObjectHeap, r: ObjectRef) {
        let header = heap.header_mut(r);
        if header.color != Color::Gray {
            header.color = Color::Gray;
            self.gray.push(r);
        }
    }

    /// Scans up to `work_limit` gray objects: each has its outgoing
    /// references shaded, then turns black. Returns the number of objects
    /// scanned; the queue length after the call is [`Marker::pending`].
    pub(crate) fn step(&mut self, heap: &mut ObjectHeap, work_limit: usize) -> usize {
        let mut processed = 0;
        while processed < work_limit {
            let Some(r) = self.gray.pop() else {
                break;
            };
            let field_count = heap.field_count(r);
            for index in 0..field_count {
                let value = heap.field(r, index);
                self.shade_value(heap, value);
            }
            heap.header_mut(r).color = Color::Black;
            processed += 1;
        }
        processed
    }

    /// Objects still awaiting a scan.
    pub(crate) fn pending(&self) -> usize {
        self.gray.len()
    }
}
