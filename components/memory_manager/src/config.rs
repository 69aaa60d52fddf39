//! Collector configuration.

/// Configuration for a garbage-collected heap.
///
/// Fixed at VM creation; the collector never mutates it. All ratios are
/// percentages.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Bytes per heap page. Each page holds objects of one size class.
    pub page_size: usize,
    /// Maximum committed heap size in bytes. Growth past this bound triggers
    /// one synchronous full collection before allocation fails.
    pub max_heap: usize,
    /// Heap-growth multiple (percent of live objects) that arms the
    /// incremental collector: once the live count exceeds
    /// `live-at-last-cycle-end * interval_ratio / 100`, allocations start
    /// advancing the collector.
    pub interval_ratio: usize,
    /// Granularity of allocation-driven collector increments, as a percent
    /// of the scheduler chunk (100 = one chunk of work per triggering
    /// allocation).
    pub step_ratio: usize,
    /// Number of minor cycles after which a major cycle is forced, provided
    /// the old generation has grown since the last major cycle.
    pub major_inc_ratio: usize,
    /// Whether to run generational (minor/major) collection. When false,
    /// every cycle is a major cycle and the write barrier does no
    /// generational bookkeeping.
    pub generational: bool,
    /// Initial capacity (in frames) of the root-protection arena.
    pub arena_initial_capacity: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            page_size: 16 * 1024,
            max_heap: 64 * 1024 * 1024,
            interval_ratio: 200,
            step_ratio: 200,
            major_inc_ratio: 100,
            generational: true,
            arena_initial_capacity: 16,
        }
    }
}

impl GcConfig {
    /// Maximum number of committed pages implied by `max_heap`.
    pub(crate) fn max_pages(&self) -> usize {
        (self.max_heap / self.page_size).max(1)
    }
}
