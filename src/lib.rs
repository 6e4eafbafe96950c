//! search-registry: an event-driven facade over a host browser's
//! search-engine registry.
//!
//! The host search service is the system of record: it owns engine
//! persistence, submission-URL construction, and raw engine mutation. This
//! crate wraps that service behind a stable object model
//! ([`EngineRegistry`] + [`EngineHandle`]), re-emits the host's internal
//! lifecycle notifications as a normalized [`EngineEvent`] vocabulary, and
//! shims a per-engine suggestion URL onto engines the host treats as
//! read-only.

pub mod events;
pub mod host;
pub mod registry;
pub mod response;

pub use events::{EngineEvent, EventBus, ListenerId};
pub use host::memory::MemoryHost;
pub use host::{
    EngineDescriptor, EngineType, HostEngine, HostError, HostNotification, HostSignal,
    SearchService, Submission, SubmissionMethod, SubscriptionId,
};
pub use registry::{EngineHandle, EngineRegistry, EngineSnapshot, NewEngine, SuggestOverrides};
pub use response::{ResponseType, URLTYPE_SEARCH_HTML, URLTYPE_SUGGEST_JSON};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Placeholder token replaced with the percent-encoded search terms when a
/// URL template is expanded.
pub const SEARCH_TERMS_PLACEHOLDER: &str = "{searchTerms}";

/// Expand a URL template by substituting [`SEARCH_TERMS_PLACEHOLDER`] with
/// the percent-encoded search terms.
pub fn expand_template(template: &str, terms: &str) -> String {
    template.replace(SEARCH_TERMS_PLACEHOLDER, &urlencoding::encode(terms))
}
