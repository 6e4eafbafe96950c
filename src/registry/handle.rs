//! Value-like wrapper around one host engine record.

use super::RegistryInner;
use crate::events::EngineEvent;
use crate::host::{EngineType, HostEngine, HostError, Submission};
use crate::response::ResponseType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

/// Sentinel used in place of real terms when serializing an engine, so the
/// produced URL stays a template the caller can substitute into later
/// without another submission round-trip.
const SEARCH_SENTINEL: &str = "__SEARCH__";

/// A thin, stateless projection of one host engine.
///
/// Handles are constructed fresh on every registry lookup and own no
/// mutable state; every mutation passes through to the host. Two handles
/// compare equal iff their names match, since engine names are unique
/// host-wide.
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn HostEngine>,
    registry: Arc<RegistryInner>,
}

impl EngineHandle {
    pub(crate) fn new(engine: Arc<dyn HostEngine>, registry: Arc<RegistryInner>) -> Self {
        Self { engine, registry }
    }

    pub(crate) fn host_engine(&self) -> Arc<dyn HostEngine> {
        Arc::clone(&self.engine)
    }

    pub fn name(&self) -> String {
        self.engine.name()
    }

    pub fn alias(&self) -> Option<String> {
        self.engine.alias()
    }

    pub fn description(&self) -> String {
        self.engine.description()
    }

    pub fn hidden(&self) -> bool {
        self.engine.hidden()
    }

    /// Directly flip host-side visibility, bypassing the registry's
    /// add/remove event machinery. [`EngineRegistry::add`] and
    /// [`EngineRegistry::remove`] are the high-level path.
    ///
    /// [`EngineRegistry::add`]: super::EngineRegistry::add
    /// [`EngineRegistry::remove`]: super::EngineRegistry::remove
    pub fn set_hidden(&self, hidden: bool) {
        self.engine.set_hidden(hidden);
    }

    /// Icon URI, or the empty string when the engine has none.
    pub fn icon(&self) -> String {
        self.engine.icon_uri().unwrap_or_default()
    }

    /// URL of the engine's plain search page.
    pub fn search_form(&self) -> String {
        self.engine.search_form()
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine.engine_type()
    }

    /// Whether this is the active engine.
    pub fn is_current(&self) -> bool {
        RegistryInner::current(&self.registry)
            .is_some_and(|engine| engine.name() == self.name())
    }

    /// Whether this is the default visible engine.
    pub fn is_default(&self) -> bool {
        RegistryInner::default(&self.registry)
            .is_some_and(|engine| engine.name() == self.name())
    }

    /// Whether this is the factory-default engine, visible or not.
    pub fn is_original_default(&self) -> bool {
        RegistryInner::original_default(&self.registry)
            .is_some_and(|engine| engine.name() == self.name())
    }

    /// Factory-shipped engines are read-only, whatever their current
    /// visibility.
    pub fn read_only(&self) -> bool {
        let name = self.name();
        self.registry
            .host
            .default_engines()
            .iter()
            .any(|engine| engine.name() == name)
    }

    /// Build the host submission for `terms`, or `None` when the engine has
    /// no URL for `response_type`. The [`Submission`] carries the form body
    /// for `post` engines.
    pub fn submission_uri(&self, terms: &str, response_type: ResponseType) -> Option<Submission> {
        self.engine.submission(terms, response_type)
    }

    /// The submission URL string for `terms`, or `None`.
    pub fn submission(&self, terms: &str, response_type: ResponseType) -> Option<String> {
        self.submission_uri(terms, response_type)
            .map(|submission| submission.url.to_string())
    }

    /// Convenience for the common HTML search submission.
    pub fn search_url(&self, terms: &str) -> Option<String> {
        self.submission(terms, ResponseType::SearchHtml)
    }

    /// The suggestion URL for `terms`: a registered override wins,
    /// otherwise the host's native suggest submission. `None` when neither
    /// exists.
    pub fn suggestion(&self, terms: &str) -> Option<String> {
        self.registry
            .overrides
            .expand(&self.name(), terms)
            .or_else(|| self.submission(terms, ResponseType::SuggestJson))
    }

    /// Append a raw parameter to the engine's URL for `response_type`.
    ///
    /// The host aborts the process on parameter writes to read-only
    /// engines, so those never reach it: the special `suggest` parameter is
    /// routed through [`add_suggest`](Self::add_suggest) and anything else
    /// is silently dropped. Mutable engines delegate straight to the host.
    pub fn add_param(
        &self,
        name: &str,
        value: &str,
        response_type: ResponseType,
    ) -> Result<(), HostError> {
        if self.read_only() {
            if name == "suggest" {
                self.add_suggest(value);
            } else {
                debug!(
                    "dropping parameter `{}` for read-only engine {}",
                    name,
                    self.name()
                );
            }
            return Ok(());
        }
        self.engine.add_param(name, value, response_type)
    }

    /// Record `url` as this engine's suggestion template and publish
    /// `suggest` (then `changed`). Works for read-only and mutable engines
    /// alike; the template never touches the host record.
    pub fn add_suggest(&self, url: &str) {
        self.registry.overrides.insert(self.name(), url);
        RegistryInner::publish(&self.registry, EngineEvent::Suggest, self.host_engine());
    }

    /// Whether the engine can produce a submission of MIME type `mime`.
    ///
    /// Anything outside the two recognized constants is unsupported. A
    /// registered suggest override implies support for both recognized
    /// types; otherwise the host is asked.
    pub fn supports_response_type(&self, mime: &str) -> bool {
        let Some(response_type) = ResponseType::from_mime(mime) else {
            return false;
        };
        if self.registry.overrides.contains(&self.name()) {
            return true;
        }
        self.engine.supports_response_type(response_type)
    }

    /// Serializable snapshot of this engine. The `url` field keeps the
    /// literal `__SEARCH__` token in place of terms so it stays a template.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            name: self.name(),
            icon: self.icon(),
            alias: self.alias(),
            hidden: self.hidden(),
            description: self.description(),
            search: self.search_form(),
            url: self.submission(SEARCH_SENTINEL, ResponseType::SearchHtml),
        }
    }
}

impl PartialEq for EngineHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for EngineHandle {}

impl Hash for EngineHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("name", &self.name())
            .field("hidden", &self.hidden())
            .finish()
    }
}

impl fmt::Display for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// JSON-friendly snapshot of an engine, in the shape consumers persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub name: String,
    pub icon: String,
    pub alias: Option<String>,
    pub hidden: bool,
    pub description: String,
    pub search: String,
    pub url: Option<String>,
}
