//! Paged, size-classed object heap.
//!
//! The heap hands out stable `(page, slot)` handles:
//! - Pages hold objects of exactly one size class and keep an intrusive
//!   free list through the object headers.
//! - Objects are never relocated. A slot's field array is allocated once
//!   when its page is created and reused across free/allocate, so unmanaged
//!   code may hold handles across collection steps.
//! - Pages are recycled through a vacant-id list so a released page never
//!   shifts the index of a page that still holds live objects.

use core_types::{MemoryError, ObjectRef, Value};
use log::trace;

/// Marking state of an object (tri-color abstraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Not yet reached in the current cycle (collectable at sweep time)
    White,
    /// Reached but not yet scanned (in the gray queue)
    Gray,
    /// Reached and fully scanned
    Black,
}

/// Age classification for generational collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Allocated since the last cycle this object survived
    Young,
    /// Survived a collection cycle; skipped by minor sweeps
    Old,
}

/// Object kind stored in the header.
///
/// `Free` marks a vacant slot; the header's free-list link is meaningful
/// only while the tag is `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// Vacant slot on the page free list
    Free,
    /// Plain record with named fields (layout owned by the object model)
    Record,
    /// Linear sequence of values
    List,
    /// Function object with captured upvalues
    Closure,
}

/// Allocation bucket, by field count.
///
/// Every page serves one class; an object's class never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// 4 value slots
    Tiny,
    /// 8 value slots
    Small,
    /// 16 value slots
    Medium,
    /// 32 value slots
    Large,
}

impl SizeClass {
    /// All classes, in bucket order.
    pub const ALL: [SizeClass; 4] = [
        SizeClass::Tiny,
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
    ];

    /// Number of `Value` fields an object of this class holds.
    pub fn field_count(&self) -> usize {
        match self {
            SizeClass::Tiny => 4,
            SizeClass::Small => 8,
            SizeClass::Medium => 16,
            SizeClass::Large => 32,
        }
    }

    /// Smallest class that fits `n` fields.
    pub fn for_field_count(n: usize) -> Option<SizeClass> {
        SizeClass::ALL.iter().copied().find(|c| c.field_count() >= n)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            SizeClass::Tiny => 0,
            SizeClass::Small => 1,
            SizeClass::Medium => 2,
            SizeClass::Large => 3,
        }
    }

    /// Approximate per-object footprint used to derive page capacity.
    fn object_bytes(&self) -> usize {
        std::mem::size_of::<ObjectHeader>() + self.field_count() * std::mem::size_of::<Value>()
    }
}

/// Sentinel for "no next slot" in the intrusive free list.
const NIL_SLOT: u32 = u32::MAX;

/// Per-object GC metadata.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ObjectHeader {
    pub(crate) color: Color,
    pub(crate) generation: Generation,
    pub(crate) tag: TypeTag,
    pub(crate) class: SizeClass,
    /// Free-list link; valid only while `tag == TypeTag::Free`.
    pub(crate) next_free: u32,
}

/// One object slot: header plus its field array.
///
/// The field array is allocated when the page is created and reused for
/// every object that ever occupies the slot.
pub(crate) struct Slot {
    pub(crate) header: ObjectHeader,
    pub(crate) fields: Box<[Value]>,
}

/// A fixed-capacity granule of slots of one size class.
pub(crate) struct Page {
    pub(crate) class: SizeClass,
    pub(crate) slots: Box<[Slot]>,
    free_head: u32,
    pub(crate) live: u32,
}

impl Page {
    fn new(class: SizeClass, capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|i| Slot {
                header: ObjectHeader {
                    color: Color::White,
                    generation: Generation::Young,
                    tag: TypeTag::Free,
                    class,
                    next_free: if i + 1 < capacity { (i + 1) as u32 } else { NIL_SLOT },
                },
                fields: vec![Value::Nil; class.field_count()].into_boxed_slice(),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Page {
            class,
            slots,
            free_head: 0,
            live: 0,
        }
    }

    fn pop_free(&mut self) -> Option<u32> {
        if self.free_head == NIL_SLOT {
            return None;
        }
        let slot = self.free_head;
        self.free_head = self.slots[slot as usize].header.next_free;
        self.live += 1;
        Some(slot)
    }

    /// Finalizes a slot and returns it to the free list. Clearing the field
    /// array releases every reference the object held; this runs exactly
    /// once per occupancy because the tag flips to `Free` here.
    fn release_slot(&mut self, slot: u32) {
        let s = &mut self.slots[slot as usize];
        for f in s.fields.iter_mut() {
            *f = Value::Nil;
        }
        s.header.tag = TypeTag::Free;
        s.header.color = Color::White;
        s.header.generation = Generation::Young;
        s.header.next_free = self.free_head;
        self.free_head = slot;
        self.live -= 1;
    }

    fn has_free(&self) -> bool {
        self.free_head != NIL_SLOT
    }
}

/// The paged object heap.
///
/// Owns every page and all allocation bookkeeping. Collection policy (when
/// to mark, when to sweep) lives in the [`Gc`](crate::Gc) context; the heap
/// only provides O(1) allocation, slot reclamation and page management.
pub struct ObjectHeap {
    page_size: usize,
    max_pages: usize,
    /// Page table. `None` entries are released pages awaiting reuse; a page
    /// id is never reassigned while any live object handle names it.
    pub(crate) pages: Vec<Option<Page>>,
    vacant_pages: Vec<u32>,
    /// Per-class stacks of page ids that may have free slots.
    partial: [Vec<u32>; 4],
    /// Occupied slots across all pages (including not-yet-swept garbage).
    pub(crate) live_objects: usize,
    /// Occupied slots in the old generation.
    pub(crate) live_old: usize,
    committed_pages: usize,
}

impl ObjectHeap {
    pub(crate) fn new(page_size: usize, max_pages: usize) -> Self {
        ObjectHeap {
            page_size,
            max_pages,
            pages: Vec::new(),
            vacant_pages: Vec::new(),
            partial: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
            live_objects: 0,
            live_old: 0,
            committed_pages: 0,
        }
    }

    /// Pops a slot from the class's partial-page list, growing by one page
    /// when every committed page of the class is full.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfMemory`] when the heap is at `max_pages` and no
    /// slot of the class is free. The owning context retries after an
    /// emergency full collection before surfacing the error.
    pub(crate) fn allocate(
        &mut self,
        tag: TypeTag,
        class: SizeClass,
        color: Color,
    ) -> Result<ObjectRef, MemoryError> {
        let ci = class.index();
        loop {
            while let Some(&pid) = self.partial[ci].last() {
                let page = self.pages[pid as usize]
                    .as_mut()
                    .expect("partial list names a released page");
                match page.pop_free() {
                    Some(slot) => {
                        let header = &mut page.slots[slot as usize].header;
                        header.tag = tag;
                        header.color = color;
                        header.generation = Generation::Young;
                        if !page.has_free() {
                            self.partial[ci].pop();
                        }
                        self.live_objects += 1;
                        return Ok(ObjectRef::from_raw_parts(pid, slot));
                    }
                    None => {
                        // Stale entry: the page filled up since it was listed.
                        self.partial[ci].pop();
                    }
                }
            }
            self.grow(class)?;
        }
    }

    /// Commits one more page for `class`.
    fn grow(&mut self, class: SizeClass) -> Result<(), MemoryError> {
        if self.committed_pages >= self.max_pages {
            return Err(MemoryError::OutOfMemory);
        }
        let capacity = (self.page_size / class.object_bytes()).max(1);
        let page = Page::new(class, capacity);
        let pid = match self.vacant_pages.pop() {
            Some(id) => {
                self.pages[id as usize] = Some(page);
                id
            }
            None => {
                self.pages.push(Some(page));
                (self.pages.len() - 1) as u32
            }
        };
        self.partial[class.index()].push(pid);
        self.committed_pages += 1;
        trace!(
            "heap: committed page {} ({:?}, {} slots)",
            pid,
            class,
            capacity
        );
        Ok(())
    }

    /// Finalizes one object and returns its slot to the page free list.
    pub(crate) fn reclaim_slot(&mut self, pid: u32, slot: u32) {
        let page = self.pages[pid as usize]
            .as_mut()
            .expect("sweep visited a released page");
        let was_full = !page.has_free();
        let was_old = page.slots[slot as usize].header.generation == Generation::Old;
        let ci = page.class.index();
        page.release_slot(slot);
        if was_full {
            self.partial[ci].push(pid);
        }
        self.live_objects -= 1;
        if was_old {
            self.live_old -= 1;
        }
    }

    /// Releases every fully-empty page. Called at the end of a major sweep;
    /// page ids go to the vacant list and are only reused for new pages.
    pub(crate) fn release_empty_pages(&mut self) -> usize {
        let mut released = 0;
        for pid in 0..self.pages.len() {
            let empty = matches!(&self.pages[pid], Some(p) if p.live == 0);
            if empty {
                let ci = self.pages[pid]
                    .as_ref()
                    .expect("checked above")
                    .class
                    .index();
                self.pages[pid] = None;
                self.partial[ci].retain(|&id| id != pid as u32);
                self.vacant_pages.push(pid as u32);
                self.committed_pages -= 1;
                released += 1;
            }
        }
        if released > 0 {
            trace!("heap: released {} empty pages", released);
        }
        released
    }

    /// Resets every live object to white. Runs once at the start of a major
    /// cycle in generational mode, where old objects are otherwise retained
    /// black between minor cycles.
    pub(crate) fn whiten_all(&mut self) {
        for page in self.pages.iter_mut().flatten() {
            for slot in page.slots.iter_mut() {
                if slot.header.tag != TypeTag::Free {
                    slot.header.color = Color::White;
                }
            }
        }
    }

    pub(crate) fn header(&self, r: ObjectRef) -> &ObjectHeader {
        &self.pages[r.page_index() as usize]
            .as_ref()
            .expect("object handle names a released page")
            .slots[r.slot_index() as usize]
            .header
    }

    pub(crate) fn header_mut(&mut self, r: ObjectRef) -> &mut ObjectHeader {
        &mut self.pages[r.page_index() as usize]
            .as_mut()
            .expect("object handle names a released page")
            .slots[r.slot_index() as usize]
            .header
    }

    /// Reads one field.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the object's size class.
    pub fn field(&self, r: ObjectRef, index: usize) -> Value {
        debug_assert!(
            self.header(r).tag != TypeTag::Free,
            "field read through a dangling handle"
        );
        self.pages[r.page_index() as usize]
            .as_ref()
            .expect("object handle names a released page")
            .slots[r.slot_index() as usize]
            .fields[index]
    }

    /// Writes one field without running the write barrier. Collector
    /// internals only; mutator writes go through the owning context.
    pub(crate) fn set_field_raw(&mut self, r: ObjectRef, index: usize, value: Value) {
        debug_assert!(
            self.header(r).tag != TypeTag::Free,
            "field write through a dangling handle"
        );
        self.pages[r.page_index() as usize]
            .as_mut()
            .expect("object handle names a released page")
            .slots[r.slot_index() as usize]
            .fields[index] = value;
    }

    /// Number of `Value` fields in the object.
    pub fn field_count(&self, r: ObjectRef) -> usize {
        self.header(r).class.field_count()
    }

    /// Occupied slots, including garbage not yet swept.
    pub fn live_objects(&self) -> usize {
        self.live_objects
    }

    /// Committed pages.
    pub fn committed_pages(&self) -> usize {
        self.committed_pages
    }

    /// Committed bytes (pages × page size).
    pub fn committed_bytes(&self) -> usize {
        self.committed_pages * self.page_size
    }
}
