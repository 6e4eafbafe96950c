//! The host search service boundary.
//!
//! Everything behind [`SearchService`] belongs to the embedding browser:
//! engine persistence, submission-URL construction, and raw engine
//! mutation. [`memory::MemoryHost`] is a self-contained implementation for
//! tests and for embedding without a real browser behind it.

mod traits;

pub mod memory;

pub use traits::*;
