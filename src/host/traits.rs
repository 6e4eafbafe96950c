//! Capability traits the host search service must provide.

use crate::response::ResponseType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors surfaced by the host search service.
///
/// The registry propagates these unmodified; it adds no retry or recovery
/// logic of its own.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("no engine named `{0}` is registered")]
    EngineNotFound(String),

    #[error("an engine named `{0}` already exists")]
    EngineExists(String),

    #[error("invalid engine URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("engine `{name}` has no URL for response type `{response_type}`")]
    UnsupportedResponseType {
        name: String,
        response_type: ResponseType,
    },

    #[error("engine `{0}` is read-only")]
    ReadOnlyEngine(String),

    #[error("search service unavailable: {0}")]
    Unavailable(String),
}

/// HTTP method used when submitting a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMethod {
    #[default]
    Get,
    Post,
}

/// Provenance of an engine record as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    /// Shipped with the host; can be hidden but never deleted.
    BuiltIn,
    /// Installed from an OpenSearch-style descriptor; fully removable.
    OpenSearch,
}

/// Descriptor for installing a new engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDescriptor {
    pub name: String,
    /// Search URL template containing `{searchTerms}`.
    pub url: String,
    #[serde(default)]
    pub method: SubmissionMethod,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Optional suggestion URL template, registered through the suggest
    /// shim once the engine exists.
    #[serde(default)]
    pub suggest: Option<String>,
}

impl EngineDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: SubmissionMethod::default(),
            icon: None,
            alias: None,
            description: None,
            suggest: None,
        }
    }

    pub fn method(mut self, method: SubmissionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn suggest(mut self, suggest: impl Into<String>) -> Self {
        self.suggest = Some(suggest.into());
        self
    }
}

/// A constructed search submission: the URL to load and, for `post`
/// engines, the form body to send with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub url: Url,
    pub post_data: Option<String>,
}

/// Raw lifecycle signals delivered on the host notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    EngineRemoved,
    EngineAdded,
    EngineChanged,
    EngineCurrent,
}

/// One notification from the host: a signal plus the affected engine.
#[derive(Clone)]
pub struct HostNotification {
    pub signal: HostSignal,
    pub engine: Arc<dyn HostEngine>,
}

impl fmt::Debug for HostNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostNotification")
            .field("signal", &self.signal)
            .field("engine", &self.engine.name())
            .finish()
    }
}

/// Observer callback invoked synchronously on notification delivery.
pub type HostObserver = Box<dyn Fn(&HostNotification) + Send + Sync>;

/// Handle returned by [`SearchService::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// One engine record owned by the host.
pub trait HostEngine: Send + Sync {
    fn name(&self) -> String;

    fn alias(&self) -> Option<String>;

    fn description(&self) -> String;

    fn hidden(&self) -> bool;

    /// Directly mutate visibility. Hosts are not required to emit a
    /// notification for this write.
    fn set_hidden(&self, hidden: bool);

    /// Icon URI, if the engine has one.
    fn icon_uri(&self) -> Option<String>;

    /// URL of the engine's plain search page.
    fn search_form(&self) -> String;

    fn engine_type(&self) -> EngineType;

    /// Build a submission for `terms`, or `None` when the engine has no URL
    /// for `response_type`.
    fn submission(&self, terms: &str, response_type: ResponseType) -> Option<Submission>;

    /// Append a raw parameter to the engine's URL for `response_type`.
    fn add_param(&self, name: &str, value: &str, response_type: ResponseType)
        -> Result<(), HostError>;

    fn supports_response_type(&self, response_type: ResponseType) -> bool;
}

/// The host search service: the system of record for engines.
pub trait SearchService: Send + Sync {
    /// The active engine, if any visible engine is selected.
    fn current_engine(&self) -> Option<Arc<dyn HostEngine>>;

    /// Make the named engine active. Unknown names are a host-level error.
    fn set_current_engine(&self, name: &str) -> Result<(), HostError>;

    /// The default visible engine; may differ from the original default
    /// when the user has hidden it.
    fn default_engine(&self) -> Option<Arc<dyn HostEngine>>;

    /// The factory-default engine, visible or not.
    fn original_default_engine(&self) -> Option<Arc<dyn HostEngine>>;

    /// Create a new engine from a descriptor.
    fn add_engine(&self, descriptor: &EngineDescriptor) -> Result<(), HostError>;

    /// Remove the named engine. Built-in engines are only hidden.
    fn remove_engine(&self, name: &str) -> Result<(), HostError>;

    fn engine_by_name(&self, name: &str) -> Option<Arc<dyn HostEngine>>;

    fn engine_by_alias(&self, alias: &str) -> Option<Arc<dyn HostEngine>>;

    /// Every factory-shipped engine, visible or not, in host order.
    fn default_engines(&self) -> Vec<Arc<dyn HostEngine>>;

    /// Every currently visible engine, in host display order.
    fn visible_engines(&self) -> Vec<Arc<dyn HostEngine>>;

    /// Subscribe to the lifecycle notification channel.
    fn subscribe(&self, observer: HostObserver) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
