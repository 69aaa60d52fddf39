//! The per-VM collector context and frame-budget scheduler.
//!
//! One [`Gc`] owns the heap, the root arena, the barrier log and all cycle
//! state for a single VM instance — never a hidden singleton, so several
//! independent VMs can coexist in one process. The embedding host drives
//! collection from its frame loop through [`Gc::step_budget`]; the VM's
//! object model allocates through [`Gc::allocate`] and mutates fields
//! through [`Gc::set_field`] so the write barrier runs on every heap
//! mutation.
//!
//! # Phase machine
//!
//! ```text
//! Idle → MarkRoots → MarkIncremental → Sweeping → Done → Idle
//! ```
//!
//! A cycle, once begun, always runs to `Done`: there is no abort path, which
//! is what keeps the tri-color invariant cheap to maintain. "Suspension"
//! means a budgeted step returns with the phase recorded; the next call
//! resumes where it left off.

use crate::barrier::WriteBarrierLog;
use crate::config::GcConfig;
use crate::heap::{Color, Generation, ObjectHeap, SizeClass, TypeTag};
use crate::marker::Marker;
use crate::roots::{FrameHandle, RootArena};
use crate::sweep::Sweeper;
use core_types::{MemoryError, ObjectRef, Value};
use log::debug;
use std::time::Instant;

/// Objects processed between wall-clock checks in `step_budget`. Bounds the
/// worst-case budget overshoot to one chunk's processing time.
const STEP_CHUNK: usize = 16;

/// Minimum live-object threshold before allocation pressure arms the
/// collector.
const THRESHOLD_FLOOR: usize = 1024;

/// State of the collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcPhase {
    /// No cycle in progress
    #[default]
    Idle,
    /// Roots are about to be shaded
    MarkRoots,
    /// Gray queue is being drained incrementally
    MarkIncremental,
    /// Unmarked objects are being reclaimed incrementally
    Sweeping,
    /// Cycle finished; the next step returns to `Idle`
    Done,
}

/// Collector counters.
#[derive(Debug, Clone, Default)]
pub struct GcStats {
    /// Objects handed out by the allocator
    pub objects_allocated: usize,
    /// Objects finalized and returned to free lists
    pub objects_reclaimed: usize,
    /// Young survivors promoted to the old generation
    pub objects_promoted: usize,
    /// Completed minor cycles
    pub minor_cycles: usize,
    /// Completed major cycles
    pub major_cycles: usize,
    /// Synchronous full collections forced by heap exhaustion
    pub emergency_collections: usize,
    /// Old→young edges recorded by the write barrier (deduplicated)
    pub barrier_registrations: usize,
    /// `step_budget` invocations that performed work
    pub budget_steps: usize,
    /// Longest single `step_budget` call observed, in nanoseconds
    pub max_step_ns: u64,
}

#[derive(Debug)]
struct GcState {
    phase: GcPhase,
    /// True while the in-flight cycle is major (whole-heap).
    full_cycle: bool,
    /// Live-object count that arms allocation-driven collection.
    threshold: usize,
    minor_since_major: usize,
    old_live_at_last_major: usize,
}

impl GcState {
    fn new() -> Self {
        GcState {
            phase: GcPhase::Idle,
            full_cycle: false,
            threshold: THRESHOLD_FLOOR,
            minor_since_major: 0,
            old_live_at_last_major: 0,
        }
    }
}

/// Garbage-collected heap context for one VM instance.
///
/// # Examples
///
/// ```
/// use memory_manager::{Gc, GcConfig, SizeClass, TypeTag};
/// use core_types::Value;
///
/// let mut gc = Gc::new(GcConfig::default());
/// let frame = gc.push_frame();
/// let obj = gc.allocate(TypeTag::Record, SizeClass::Tiny).unwrap();
/// gc.protect(frame, Value::encode_heap_ref(obj)).unwrap();
/// gc.set_field(obj, 0, Value::encode_fixnum(42));
///
/// gc.full_collect();
/// assert_eq!(gc.field(obj, 0), Value::encode_fixnum(42));
/// gc.pop_frame(frame).unwrap();
/// ```
pub struct Gc {
    config: GcConfig,
    heap: ObjectHeap,
    roots: RootArena,
    log: WriteBarrierLog,
    marker: Marker,
    sweeper: Sweeper,
    state: GcState,
    stats: GcStats,
}

impl Gc {
    /// Creates a collector with the given configuration.
    pub fn new(config: GcConfig) -> Self {
        let heap = ObjectHeap::new(config.page_size, config.max_pages());
        let roots = RootArena::new(config.arena_initial_capacity);
        Gc {
            config,
            heap,
            roots,
            log: WriteBarrierLog::new(),
            marker: Marker::new(),
            sweeper: Sweeper::new(),
            state: GcState::new(),
            stats: GcStats::default(),
        }
    }

    // ---------------------------------------------------------------------
    // Allocation
    // ---------------------------------------------------------------------

    /// Allocates an object of `class`, with all fields nil.
    ///
    /// May advance the collector by one increment first (allocation-driven
    /// stepping), and runs one synchronous full collection before giving up
    /// when the heap is at its configured maximum.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfMemory`] when the heap is at `max_heap` and the
    /// emergency collection freed nothing. Fatal: the caller must not
    /// allocate again on this heap.
    pub fn allocate(&mut self, tag: TypeTag, class: SizeClass) -> Result<ObjectRef, MemoryError> {
        self.maybe_incremental_step();

        match self.heap.allocate(tag, class, Color::White) {
            Ok(r) => {
                self.finish_allocation(r);
                Ok(r)
            }
            Err(MemoryError::OutOfMemory) => {
                debug!("gc: heap at maximum, running emergency full collection");
                self.stats.emergency_collections += 1;
                self.full_collect();
                let r = self.heap.allocate(tag, class, Color::White)?;
                self.finish_allocation(r);
                Ok(r)
            }
            Err(e) => Err(e),
        }
    }

    fn finish_allocation(&mut self, r: ObjectRef) {
        // Objects born ahead of an in-flight sweep cursor must not look
        // collectable to it; gray keeps them out of this cycle's white set
        // and the sweep resets them to white as it passes.
        if self.state.phase == GcPhase::Sweeping && !self.sweeper.already_swept(r) {
            self.heap.header_mut(r).color = Color::Gray;
        }
        self.stats.objects_allocated += 1;
    }

    /// Advances the collector by one allocation-driven increment when the
    /// live count is past the interval threshold or a cycle is in flight.
    fn maybe_incremental_step(&mut self) {
        if self.state.phase == GcPhase::Idle {
            if self.heap.live_objects < self.state.threshold {
                return;
            }
            self.begin_cycle(false);
        }
        let work = (STEP_CHUNK * self.config.step_ratio / 100).max(1);
        self.step_work(work);
        if self.state.phase == GcPhase::Done {
            self.state.phase = GcPhase::Idle;
        }
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Reads a field.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the object's size class.
    pub fn field(&self, owner: ObjectRef, index: usize) -> Value {
        self.heap.field(owner, index)
    }

    /// Writes a field, running the write barrier first.
    pub fn set_field(&mut self, owner: ObjectRef, index: usize, value: Value) {
        self.on_field_write(owner, value);
        self.heap.set_field_raw(owner, index, value);
    }

    /// Write barrier, executed on every heap field mutation.
    ///
    /// Two independent duties:
    /// 1. While a mark phase is active, a black owner acquiring a white
    ///    referent would break the tri-color invariant; the referent is
    ///    shaded gray immediately.
    /// 2. In generational mode, an old owner acquiring a young referent is
    ///    recorded in the barrier log so the next minor cycle rescans it.
    ///
    /// Exposed for native extensions that manage their own field storage;
    /// [`Gc::set_field`] calls it automatically.
    pub fn on_field_write(&mut self, owner: ObjectRef, new_value: Value) {
        let Value::Ref(child) = new_value else {
            return;
        };
        let owner_header = *self.heap.header(owner);
        let child_header = *self.heap.header(child);

        if matches!(self.state.phase, GcPhase::MarkRoots | GcPhase::MarkIncremental)
            && owner_header.color == Color::Black
            && child_header.color == Color::White
        {
            self.marker.shade(&mut self.heap, child);
        }

        if self.config.generational && child_header.generation == Generation::Young {
            // A black owner mid-sweep has already been marked surviving and
            // will be promoted when the cursor reaches it; the edge must be
            // logged now or the next minor cycle loses it.
            let owner_is_old = owner_header.generation == Generation::Old
                || (owner_header.color == Color::Black && self.state.phase == GcPhase::Sweeping);
            if owner_is_old && self.log.insert(owner) {
                self.stats.barrier_registrations += 1;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Root protection
    // ---------------------------------------------------------------------

    /// Opens a root-protection frame. See [`RootArena::push_frame`].
    pub fn push_frame(&mut self) -> FrameHandle {
        self.roots.push_frame()
    }

    /// Registers a value as a GC root until the frame is popped.
    pub fn protect(&mut self, handle: FrameHandle, value: Value) -> Result<(), MemoryError> {
        self.roots.protect(handle, value)
    }

    /// Releases every protection registered in the frame. LIFO order is
    /// mandatory.
    pub fn pop_frame(&mut self, handle: FrameHandle) -> Result<(), MemoryError> {
        self.roots.pop_frame(handle)
    }

    // ---------------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------------

    /// Frame-loop hook: advances the collector until `budget_ns` elapses or
    /// the cycle completes. Returns the number of objects processed.
    ///
    /// Idle with no allocation pressure is an immediate no-op returning 0.
    /// Work is metered in chunks of 16 objects with a wall-clock check after
    /// each chunk, so a call never overruns the budget by more than one
    /// chunk's processing time.
    pub fn step_budget(&mut self, budget_ns: u64) -> usize {
        if self.state.phase == GcPhase::Idle && self.heap.live_objects < self.state.threshold {
            return 0;
        }

        let start = Instant::now();
        let mut processed = 0;
        loop {
            match self.state.phase {
                GcPhase::Idle => {
                    if self.heap.live_objects < self.state.threshold {
                        break;
                    }
                    self.begin_cycle(false);
                }
                GcPhase::Done => {
                    self.state.phase = GcPhase::Idle;
                    break;
                }
                _ => {
                    processed += self.step_work(STEP_CHUNK);
                }
            }
            if start.elapsed().as_nanos() as u64 >= budget_ns {
                break;
            }
        }

        self.stats.budget_steps += 1;
        let elapsed = start.elapsed().as_nanos() as u64;
        if elapsed > self.stats.max_step_ns {
            self.stats.max_step_ns = elapsed;
        }
        processed
    }

    /// Runs a complete collection unconditionally: any in-flight cycle is
    /// finished first (cycles cannot abort), then one major cycle runs to
    /// `Done`. For deterministic pause points and the allocator's
    /// out-of-memory fallback.
    pub fn full_collect(&mut self) {
        self.run_to_idle();
        self.begin_cycle(true);
        self.run_to_idle();
    }

    fn run_to_idle(&mut self) {
        loop {
            match self.state.phase {
                GcPhase::Idle => break,
                GcPhase::Done => self.state.phase = GcPhase::Idle,
                _ => {
                    self.step_work(usize::MAX);
                }
            }
        }
    }

    /// Dispatches one bounded unit of work to the current phase.
    fn step_work(&mut self, work_limit: usize) -> usize {
        match self.state.phase {
            GcPhase::Idle | GcPhase::Done => 0,
            GcPhase::MarkRoots => {
                self.mark_roots();
                0
            }
            GcPhase::MarkIncremental => {
                let processed = self.marker.step(&mut self.heap, work_limit);
                if self.marker.pending() == 0 {
                    self.finish_mark();
                }
                processed
            }
            GcPhase::Sweeping => {
                let out = self.sweeper.step(
                    &mut self.heap,
                    work_limit,
                    self.state.full_cycle,
                    self.config.generational,
                );
                self.stats.objects_reclaimed += out.reclaimed;
                self.stats.objects_promoted += out.promoted;
                if out.done {
                    self.finish_cycle();
                }
                out.visited
            }
        }
    }

    fn begin_cycle(&mut self, force_full: bool) {
        debug_assert_eq!(self.marker.pending(), 0, "gray queue must drain before a new cycle");
        let full = force_full
            || !self.config.generational
            || (self.state.minor_since_major > self.config.major_inc_ratio
                && self.heap.live_old > self.state.old_live_at_last_major);
        self.state.full_cycle = full;
        if full && self.config.generational {
            // Old objects are retained black between minor cycles; a major
            // cycle must re-examine them from scratch.
            self.heap.whiten_all();
        }
        self.state.phase = GcPhase::MarkRoots;
        debug!(
            "gc: {} cycle started (live {}, threshold {})",
            if full { "major" } else { "minor" },
            self.heap.live_objects,
            self.state.threshold
        );
    }

    fn mark_roots(&mut self) {
        let root_values: Vec<Value> = self.roots.iter_values().collect();
        for value in root_values {
            self.marker.shade_value(&mut self.heap, value);
        }
        if !self.state.full_cycle {
            for owner in self.log.snapshot() {
                self.marker.enqueue_logged(&mut self.heap, owner);
            }
        }
        self.state.phase = GcPhase::MarkIncremental;
    }

    /// Final re-mark before sweeping: values protected (or barrier-logged)
    /// after `mark_roots` ran must not be swept. The drain is unbounded but
    /// only covers what the re-shade uncovered.
    fn finish_mark(&mut self) {
        let root_values: Vec<Value> = self.roots.iter_values().collect();
        for value in root_values {
            self.marker.shade_value(&mut self.heap, value);
        }
        if !self.state.full_cycle {
            for owner in self.log.snapshot() {
                self.marker.enqueue_logged(&mut self.heap, owner);
            }
        }
        while self.marker.pending() > 0 {
            self.marker.step(&mut self.heap, usize::MAX);
        }
        self.sweeper.reset();
        self.state.phase = GcPhase::Sweeping;
    }

    fn finish_cycle(&mut self) {
        if self.state.full_cycle {
            self.heap.release_empty_pages();
            // After a major cycle every survivor is old: no old→young edge
            // can have outlived the sweep.
            self.log.clear();
            self.state.minor_since_major = 0;
            self.state.old_live_at_last_major = self.heap.live_old;
            self.stats.major_cycles += 1;
        } else {
            self.state.minor_since_major += 1;
            self.stats.minor_cycles += 1;
        }
        self.state.threshold = (self.heap.live_objects * self.config.interval_ratio / 100)
            .max(THRESHOLD_FLOOR);
        self.state.phase = GcPhase::Done;
        debug!(
            "gc: cycle complete (live {}, next threshold {})",
            self.heap.live_objects, self.state.threshold
        );
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    /// Current phase of the collection cycle.
    pub fn phase(&self) -> GcPhase {
        self.state.phase
    }

    /// Read-only view of the underlying object heap.
    pub fn heap(&self) -> &ObjectHeap {
        &self.heap
    }

    /// Collector counters.
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// The configuration this collector was created with.
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Occupied slots, including garbage not yet swept.
    pub fn live_objects(&self) -> usize {
        self.heap.live_objects()
    }

    /// Committed heap size in bytes.
    pub fn committed_bytes(&self) -> usize {
        self.heap.committed_bytes()
    }

    /// Committed pages.
    pub fn committed_pages(&self) -> usize {
        self.heap.committed_pages()
    }

    /// Number of deduplicated owners in the write-barrier log.
    pub fn barrier_log_len(&self) -> usize {
        self.log.len()
    }

    /// True while the slot behind `r` holds a live object. A reclaimed slot
    /// may be recycled by a later allocation, so this is meaningful only
    /// when the caller controls allocation in between.
    pub fn is_live(&self, r: ObjectRef) -> bool {
        self.heap.header(r).tag != TypeTag::Free
    }

    /// Generation of a live object.
    pub fn generation_of(&self, r: ObjectRef) -> Generation {
        self.heap.header(r).generation
    }

    /// Type tag of a live object.
    pub fn tag_of(&self, r: ObjectRef) -> TypeTag {
        self.heap.header(r).tag
    }
}

impl Default for Gc {
    fn default() -> Self {
        Self::new(GcConfig::default())
    }
}
