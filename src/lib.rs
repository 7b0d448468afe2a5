//! Embedding surface of the suggestion engine: an engine handle owning one
//! or more dictionaries, a reusable per-input session, and the flat output
//! contract the host keyboard consumes.

pub mod api;
pub mod trace_init;

pub use api::engine::Engine;
pub use api::session::SuggestSession;
pub use api::types::{InputPoint, Suggestion, SuggestionKind};
