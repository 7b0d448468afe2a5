//! Types crossing the engine boundary.

use std::time::{SystemTime, UNIX_EPOCH};

pub use tap_core::dict::{CodePoint, DictError, Dictionary, FormatVersion};
pub use tap_core::suggest::{
    InputPoint, ProximityInfo, Suggestion, SuggestionKind, MAX_RESULTS,
};

pub use tap_core::dict::MAX_WORD_LENGTH;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no dictionary at index {0}")]
    NoSuchDictionary(usize),
    #[error(transparent)]
    Dict(#[from] DictError),
}

/// Seconds since the epoch, the time base for decaying dictionaries.
pub fn now_epoch() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}
