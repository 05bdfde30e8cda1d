//! Placement of frame execution onto an appropriately sized stack.

use super::budget::StackBudget;
use kestrel_vm_types::{EngineResult, FatalError};
use std::{panic, thread};

/// Run `f` on a stack suited to a frame at `depth`.
///
/// Frames short of the budget's offload depth run inline on the current
/// stack. The frame at exactly the offload depth is relocated onto a
/// dedicated thread sized for every depth the chain may still reach;
/// deeper frames compare unequal again, so a chain relocates at most once.
///
/// The call blocks until `f` returns. Faults inside `f` travel back as
/// ordinary values, and a panic resumes on the calling thread with its
/// original payload, so callers observe relocated and inline execution
/// identically.
pub fn place<T, F>(
    budget: &StackBudget, max_depth: usize, depth: usize, f: F,
) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send,
    T: Send,
{
    if depth != budget.offload_depth() {
        f()
    } else {
        relocate(budget.relocated_stack_size(max_depth), f)
    }
}

fn relocate<T, F>(stack_size: usize, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T> + Send,
    T: Send,
{
    debug!("relocating execution onto a {} byte stack", stack_size);
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("frame-offload".into())
            .stack_size(stack_size)
            .spawn_scoped(scope, f)
            .map_err(FatalError::StackRelocation)?;
        handle
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload))
    })
}
