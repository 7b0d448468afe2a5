//! Host-facing API: engine handle, per-input session and output types.

pub mod engine;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;
