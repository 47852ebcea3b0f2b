//! Thread-local assembly stack for circular dependency detection.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

// Each thread sees only its own in-progress identifiers, so unrelated
// top-level assemblies on other threads never look like cycles.
thread_local! {
    static ASSEMBLY_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

struct Frame {
    owner: usize,
    id: String,
}

/// Guard for one identifier on the thread-local assembly stack.
///
/// Entering fails if the identifier is already being assembled by the same
/// assembler on this thread. Dropping the guard pops the identifier, on
/// success, error or unwind alike.
pub(crate) struct StackGuard {
    owner: usize,
}

impl StackGuard {
    pub(crate) fn enter(owner: usize, id: &str, max_depth: usize) -> DiResult<Self> {
        ASSEMBLY_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let mine = stack.iter().filter(|frame| frame.owner == owner);

            // Circular detection BEFORE pushing the new identifier
            if mine.clone().any(|frame| frame.id == id) {
                let mut path: Vec<String> = mine.map(|frame| frame.id.clone()).collect();
                path.push(id.to_string());
                return Err(DiError::Circular(path));
            }

            let depth = mine.count();
            if depth >= max_depth {
                return Err(DiError::DepthExceeded(depth));
            }

            stack.push(Frame {
                owner,
                id: id.to_string(),
            });
            tracing::trace!(id, depth = depth + 1, "pushed onto assembly stack");
            Ok(Self { owner })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        // try_with: the thread-local may already be gone during thread teardown
        let _ = ASSEMBLY_STACK.try_with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(index) = stack.iter().rposition(|frame| frame.owner == self.owner) {
                stack.remove(index);
            }
        });
    }
}

/// Identifiers currently being assembled by `owner` on this thread, outermost first.
#[cfg(any(test, feature = "diagnostics"))]
pub(crate) fn snapshot(owner: usize) -> Vec<String> {
    ASSEMBLY_STACK.with(|stack| {
        stack
            .borrow()
            .iter()
            .filter(|frame| frame.owner == owner)
            .map(|frame| frame.id.clone())
            .collect()
    })
}
