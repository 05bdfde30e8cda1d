//! Sizing rules for frame stack placement.

/// Stack size estimated for each level of frame depth. (Debug build)
#[cfg(debug_assertions)]
const STACK_SIZE_PER_FRAME: usize = 128 * 1024;

/// Stack size estimated for each level of frame depth.
#[cfg(not(debug_assertions))]
const STACK_SIZE_PER_FRAME: usize = 24 * 1024;

/// Entry stack overhead prior to execution. (Debug build)
#[cfg(debug_assertions)]
const STACK_SIZE_ENTRY_OVERHEAD: usize = 100 * 1024;

/// Entry stack overhead prior to execution.
#[cfg(not(debug_assertions))]
const STACK_SIZE_ENTRY_OVERHEAD: usize = 20 * 1024;

/// Stack size assumed for the thread entering the engine.
const DEFAULT_STACK_SIZE: usize = 8 * 1024 * 1024;

/// Runtime stack-sizing parameters for the frame governor.
///
/// Frames up to the offload depth run on the caller's stack; the frame at
/// exactly the offload depth is moved to a dedicated thread whose stack is
/// sized for every depth the chain may still reach. The arithmetic keeps
/// `offload_depth() * per_frame_stack + entry_overhead <= base_stack`, so
/// inline frames can never outgrow the entry thread.
#[derive(Debug, Clone)]
pub struct StackBudget {
    per_frame_stack: usize,
    base_stack: usize,
    entry_overhead: usize,
}

impl StackBudget {
    /// A budget with explicit sizes. `per_frame_stack` must be non-zero.
    pub fn new(
        per_frame_stack: usize, base_stack: usize, entry_overhead: usize,
    ) -> StackBudget {
        assert!(per_frame_stack > 0, "per-frame stack size must be non-zero");
        StackBudget {
            per_frame_stack,
            base_stack,
            entry_overhead,
        }
    }

    /// The depth at which execution leaves the entry stack.
    pub fn offload_depth(&self) -> usize {
        self.base_stack.saturating_sub(self.entry_overhead)
            / self.per_frame_stack
    }

    /// Size of the dedicated stack for a relocated chain, assuming it may
    /// recurse to `max_depth`. Never smaller than the entry stack.
    pub fn relocated_stack_size(&self, max_depth: usize) -> usize {
        std::cmp::max(
            max_depth.saturating_sub(self.offload_depth())
                * self.per_frame_stack,
            self.base_stack,
        )
    }
}

impl Default for StackBudget {
    fn default() -> StackBudget {
        StackBudget::new(
            STACK_SIZE_PER_FRAME,
            DEFAULT_STACK_SIZE,
            STACK_SIZE_ENTRY_OVERHEAD,
        )
    }
}
