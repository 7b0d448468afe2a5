//! Per-input-session state.
//!
//! A session owns the traversal scratch (frontier arenas and the bigram
//! cache) so repeated suggestion calls during one composing word reuse
//! allocations. It carries no decoding state across calls.

use tap_core::suggest::TraverseSession;

pub struct SuggestSession {
    traverse: TraverseSession,
}

impl SuggestSession {
    pub fn new() -> Self {
        Self {
            traverse: TraverseSession::new(),
        }
    }

    pub(crate) fn traverse_mut(&mut self) -> &mut TraverseSession {
        &mut self.traverse
    }
}

impl Default for SuggestSession {
    fn default() -> Self {
        Self::new()
    }
}
