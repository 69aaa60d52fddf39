//! Incremental sweep over the page table.
//!
//! The sweeper stores a `(page, slot)` cursor and visits a bounded number of
//! slots per step. White objects are finalized and returned to their page's
//! free list; black survivors are promoted (generational) or reset to white;
//! gray objects — only newborns allocated while the sweep was in flight —
//! are reset to white untouched.

use crate::heap::{Color, Generation, ObjectHeap, TypeTag};
use core_types::ObjectRef;

/// Result of one sweep step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SweepOutcome {
    /// Slots examined (free slots included: the cursor's unit of work).
    pub visited: usize,
    /// Objects finalized and returned to free lists.
    pub reclaimed: usize,
    /// Young survivors promoted to the old generation.
    pub promoted: usize,
    /// True when the cursor has passed the last page.
    pub done: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Sweeper {
    page: u32,
    slot: u32,
}

impl Sweeper {
    pub(crate) fn new() -> Self {
        Sweeper { page: 0, slot: 0 }
    }

    /// Rewinds the cursor to the start of the heap.
    pub(crate) fn reset(&mut self) {
        self.page = 0;
        self.slot = 0;
    }

    /// True when the cursor has already passed the slot `r` names. Used by
    /// the allocator to decide the color of objects born mid-sweep: behind
    /// the cursor white is safe, ahead of it the newborn must be gray so
    /// this sweep cannot reclaim it.
    pub(crate) fn already_swept(&self, r: ObjectRef) -> bool {
        r.page_index() < self.page || (r.page_index() == self.page && r.slot_index() < self.slot)
    }

    /// Sweeps up to `work_limit` slots.
    ///
    /// `full` selects major-cycle behavior (old objects are visited);
    /// a minor sweep skips the old generation entirely. Precondition: the
    /// gray queue is empty, so any gray slot encountered is a newborn.
    pub(crate) fn step(
        &mut self,
        heap: &mut ObjectHeap,
        work_limit: usize,
        full: bool,
        generational: bool,
    ) -> SweepOutcome {
        let mut outcome = SweepOutcome {
            visited: 0,
            reclaimed: 0,
            promoted: 0,
            done: false,
        };

        while (self.page as usize) < heap.pages.len() {
            let capacity = match &heap.pages[self.page as usize] {
                Some(p) => p.slots.len() as u32,
                None => {
                    self.page += 1;
                    self.slot = 0;
                    continue;
                }
            };

            while self.slot < capacity {
                if outcome.visited >= work_limit {
                    return outcome;
                }
                let pid = self.page;
                let sid = self.slot;
                self.slot += 1;
                outcome.visited += 1;

                let r = ObjectRef::from_raw_parts(pid, sid);
                let header = *heap.header(r);
                if header.tag == TypeTag::Free {
                    continue;
                }
                if !full && header.generation == Generation::Old {
                    continue;
                }

                match header.color {
                    Color::White => {
                        heap.reclaim_slot(pid, sid);
                        outcome.reclaimed += 1;
                    }
                    Color::Black => {
                        if generational {
                            if header.generation == Generation::Young {
                                heap.header_mut(r).generation = Generation::Old;
                                heap.live_old += 1;
                                outcome.promoted += 1;
                            }
                            // Old survivors keep their black color between
                            // minor cycles; a major cycle whitens them at
                            // mark-root time.
                        } else {
                            heap.header_mut(r).color = Color::White;
                        }
                    }
                    Color::Gray => {
                        // Newborn allocated ahead of the cursor.
                        heap.header_mut(r).color = Color::White;
                    }
                }
            }

            self.page += 1;
            self.slot = 0;
        }

        outcome.done = true;
        outcome
    }
}
