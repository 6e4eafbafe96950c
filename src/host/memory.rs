//! In-memory host search service.
//!
//! [`MemoryHost`] implements the full [`SearchService`] contract without a
//! browser behind it: built-in engines can only be hidden, user-installed
//! engines are deleted outright, and lifecycle notifications are delivered
//! synchronously to subscribers. It backs the crate's tests and works as a
//! standalone host wherever no real browser is available.

use super::traits::{
    EngineDescriptor, EngineType, HostEngine, HostError, HostNotification, HostObserver,
    HostSignal, SearchService, Submission, SubmissionMethod, SubscriptionId,
};
use crate::expand_template;
use crate::response::ResponseType;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use url::Url;

/// One engine record held by [`MemoryHost`].
#[derive(Debug)]
pub struct MemoryEngine {
    name: String,
    alias: Option<String>,
    description: String,
    icon: Option<String>,
    search_form: String,
    method: SubmissionMethod,
    engine_type: EngineType,
    hidden: AtomicBool,
    urls: Mutex<HashMap<ResponseType, String>>,
}

impl MemoryEngine {
    fn from_descriptor(
        descriptor: &EngineDescriptor,
        engine_type: EngineType,
    ) -> Result<Self, HostError> {
        // Validate the template up front so submission construction cannot
        // fail later.
        let probe = expand_template(&descriptor.url, "probe");
        let parsed = Url::parse(&probe).map_err(|source| HostError::InvalidUrl {
            url: descriptor.url.clone(),
            source,
        })?;
        let search_form = parsed.origin().ascii_serialization();

        let mut urls = HashMap::new();
        urls.insert(ResponseType::SearchHtml, descriptor.url.clone());
        // Only provisioning-time built-ins get a host-native suggest URL;
        // descriptors installed at runtime go through the registry's
        // suggest shim instead.
        if engine_type == EngineType::BuiltIn {
            if let Some(suggest) = &descriptor.suggest {
                urls.insert(ResponseType::SuggestJson, suggest.clone());
            }
        }

        Ok(Self {
            name: descriptor.name.clone(),
            alias: descriptor.alias.clone(),
            description: descriptor.description.clone().unwrap_or_default(),
            icon: descriptor.icon.clone(),
            search_form,
            method: descriptor.method,
            engine_type,
            hidden: AtomicBool::new(false),
            urls: Mutex::new(urls),
        })
    }
}

impl HostEngine for MemoryEngine {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn alias(&self) -> Option<String> {
        self.alias.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }

    fn set_hidden(&self, hidden: bool) {
        // A direct visibility write; no notification goes out. Callers that
        // want events go through the host's add/remove operations.
        self.hidden.store(hidden, Ordering::SeqCst);
    }

    fn icon_uri(&self) -> Option<String> {
        self.icon.clone()
    }

    fn search_form(&self) -> String {
        self.search_form.clone()
    }

    fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    fn submission(&self, terms: &str, response_type: ResponseType) -> Option<Submission> {
        let template = self.urls.lock().unwrap().get(&response_type)?.clone();
        let expanded = expand_template(&template, terms);
        match self.method {
            SubmissionMethod::Get => Url::parse(&expanded)
                .ok()
                .map(|url| Submission { url, post_data: None }),
            SubmissionMethod::Post => {
                // Form parameters move into the POST body; the URL keeps
                // only the action.
                let (action, body) = match expanded.split_once('?') {
                    Some((action, body)) => (action, body),
                    None => (expanded.as_str(), ""),
                };
                Url::parse(action).ok().map(|url| Submission {
                    url,
                    post_data: Some(body.to_string()),
                })
            }
        }
    }

    fn add_param(
        &self,
        name: &str,
        value: &str,
        response_type: ResponseType,
    ) -> Result<(), HostError> {
        if self.engine_type == EngineType::BuiltIn {
            return Err(HostError::ReadOnlyEngine(self.name.clone()));
        }
        let mut urls = self.urls.lock().unwrap();
        let template =
            urls.get_mut(&response_type)
                .ok_or_else(|| HostError::UnsupportedResponseType {
                    name: self.name.clone(),
                    response_type,
                })?;
        let separator = if template.contains('?') { '&' } else { '?' };
        template.push(separator);
        template.push_str(name);
        template.push('=');
        template.push_str(value);
        Ok(())
    }

    fn supports_response_type(&self, response_type: ResponseType) -> bool {
        self.urls.lock().unwrap().contains_key(&response_type)
    }
}

type ObserverSlot = (SubscriptionId, Arc<dyn Fn(&HostNotification) + Send + Sync>);

#[derive(Default)]
struct HostState {
    engines: Vec<Arc<MemoryEngine>>,
    current: Option<String>,
    original_default: Option<String>,
}

impl HostState {
    fn find(&self, name: &str) -> Option<Arc<MemoryEngine>> {
        self.engines.iter().find(|e| e.name == name).cloned()
    }

    fn default_visible(&self) -> Option<Arc<MemoryEngine>> {
        self.original_default
            .as_ref()
            .and_then(|name| self.find(name))
            .filter(|e| !e.hidden())
            .or_else(|| self.engines.iter().find(|e| !e.hidden()).cloned())
    }
}

/// In-memory [`SearchService`].
///
/// State sits behind a mutex that is always released before observers are
/// notified, so observers may call back into the host.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
    observers: Mutex<Vec<ObserverSlot>>,
    next_subscription: AtomicU64,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host provisioned like an en-US browser profile: seven built-in
    /// engines, with Google as the original default and active engine.
    pub fn default_profile() -> Self {
        let host = Self::new();
        let engines = [
            EngineDescriptor::new("Google", "https://www.google.com/search?q={searchTerms}")
                .description("Google Search")
                .suggest("https://www.google.com/complete/search?client=firefox&q={searchTerms}"),
            EngineDescriptor::new("Yahoo", "https://search.yahoo.com/search?p={searchTerms}")
                .description("Yahoo Search")
                .suggest("http://ff.search.yahoo.com/gossip?output=fxjson&command={searchTerms}"),
            EngineDescriptor::new("Bing", "https://www.bing.com/search?q={searchTerms}")
                .description("Bing. Search by Microsoft.")
                .suggest("http://api.bing.com/osjson.aspx?query={searchTerms}&form=OSDJAS"),
            EngineDescriptor::new(
                "Amazon.com",
                "http://www.amazon.com/exec/obidos/external-search/?field-keywords={searchTerms}&mode=blended",
            )
            .description("Amazon.com Search"),
            EngineDescriptor::new(
                "eBay",
                "http://rover.ebay.com/rover/1/711-47294-18009-3/4?satitle={searchTerms}",
            )
            .description("eBay - Online auctions")
            .suggest("http://anywhere.ebay.com/services/suggest/?s=0&q={searchTerms}"),
            EngineDescriptor::new(
                "Wikipedia (en)",
                "http://en.wikipedia.org/wiki/Special:Search?search={searchTerms}",
            )
            .description("Wikipedia, the Free Encyclopedia")
            .suggest("http://en.wikipedia.org/w/api.php?action=opensearch&search={searchTerms}"),
            EngineDescriptor::new("Twitter", "https://twitter.com/search?q={searchTerms}")
                .description("Realtime Twitter Search"),
        ];
        for descriptor in &engines {
            host.install_built_in(descriptor)
                .expect("default profile descriptor is well-formed");
        }
        host
    }

    /// Install a factory engine during provisioning. No notification is
    /// emitted; provisioning happens before anyone subscribes. The first
    /// built-in becomes the original default and the active engine.
    pub fn install_built_in(&self, descriptor: &EngineDescriptor) -> Result<(), HostError> {
        let engine = Arc::new(MemoryEngine::from_descriptor(
            descriptor,
            EngineType::BuiltIn,
        )?);
        let mut state = self.state.lock().unwrap();
        if state.find(&descriptor.name).is_some() {
            return Err(HostError::EngineExists(descriptor.name.clone()));
        }
        if state.original_default.is_none() {
            state.original_default = Some(descriptor.name.clone());
            state.current = Some(descriptor.name.clone());
        }
        state.engines.push(engine);
        Ok(())
    }

    fn notify(&self, signal: HostSignal, engine: Arc<MemoryEngine>) {
        let observers: Vec<_> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        let notification = HostNotification {
            signal,
            engine: engine as Arc<dyn HostEngine>,
        };
        debug!("delivering {:?}", notification);
        for observer in observers {
            observer(&notification);
        }
    }
}

impl SearchService for MemoryHost {
    fn current_engine(&self) -> Option<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state
            .current
            .as_ref()
            .and_then(|name| state.find(name))
            .filter(|e| !e.hidden())
            .or_else(|| state.default_visible())
            .map(|e| e as Arc<dyn HostEngine>)
    }

    fn set_current_engine(&self, name: &str) -> Result<(), HostError> {
        let engine = {
            let mut state = self.state.lock().unwrap();
            let engine = state
                .find(name)
                .ok_or_else(|| HostError::EngineNotFound(name.to_string()))?;
            state.current = Some(name.to_string());
            engine
        };
        self.notify(HostSignal::EngineCurrent, engine);
        Ok(())
    }

    fn default_engine(&self) -> Option<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state.default_visible().map(|e| e as Arc<dyn HostEngine>)
    }

    fn original_default_engine(&self) -> Option<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state
            .original_default
            .as_ref()
            .and_then(|name| state.find(name))
            .map(|e| e as Arc<dyn HostEngine>)
    }

    fn add_engine(&self, descriptor: &EngineDescriptor) -> Result<(), HostError> {
        let engine = Arc::new(MemoryEngine::from_descriptor(
            descriptor,
            EngineType::OpenSearch,
        )?);
        {
            let mut state = self.state.lock().unwrap();
            if state.find(&descriptor.name).is_some() {
                return Err(HostError::EngineExists(descriptor.name.clone()));
            }
            state.engines.push(Arc::clone(&engine));
        }
        self.notify(HostSignal::EngineAdded, engine);
        Ok(())
    }

    fn remove_engine(&self, name: &str) -> Result<(), HostError> {
        let (signal, engine) = {
            let mut state = self.state.lock().unwrap();
            let index = state
                .engines
                .iter()
                .position(|e| e.name == name)
                .ok_or_else(|| HostError::EngineNotFound(name.to_string()))?;
            let engine = Arc::clone(&state.engines[index]);
            if engine.engine_type == EngineType::BuiltIn {
                // Built-ins survive removal; they are hidden and reported
                // as a plain change.
                engine.hidden.store(true, Ordering::SeqCst);
                (HostSignal::EngineChanged, engine)
            } else {
                state.engines.remove(index);
                if state.current.as_deref() == Some(name) {
                    state.current = None;
                }
                (HostSignal::EngineRemoved, engine)
            }
        };
        self.notify(signal, engine);
        Ok(())
    }

    fn engine_by_name(&self, name: &str) -> Option<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state.find(name).map(|e| e as Arc<dyn HostEngine>)
    }

    fn engine_by_alias(&self, alias: &str) -> Option<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state
            .engines
            .iter()
            .find(|e| e.alias.as_deref() == Some(alias))
            .cloned()
            .map(|e| e as Arc<dyn HostEngine>)
    }

    fn default_engines(&self) -> Vec<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state
            .engines
            .iter()
            .filter(|e| e.engine_type == EngineType::BuiltIn)
            .cloned()
            .map(|e| e as Arc<dyn HostEngine>)
            .collect()
    }

    fn visible_engines(&self) -> Vec<Arc<dyn HostEngine>> {
        let state = self.state.lock().unwrap();
        state
            .engines
            .iter()
            .filter(|e| !e.hidden())
            .cloned()
            .map(|e| e as Arc<dyn HostEngine>)
            .collect()
    }

    fn subscribe(&self, observer: HostObserver) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().unwrap().push((id, Arc::from(observer)));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.observers
            .lock()
            .unwrap()
            .retain(|(subscription, _)| *subscription != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_engines() {
        let host = MemoryHost::default_profile();
        assert_eq!(host.visible_engines().len(), 7);
        assert_eq!(host.default_engines().len(), 7);
        assert_eq!(host.current_engine().unwrap().name(), "Google");
        assert_eq!(host.original_default_engine().unwrap().name(), "Google");
    }

    #[test]
    fn test_removing_built_in_only_hides_it() {
        let host = MemoryHost::default_profile();
        host.remove_engine("Google").unwrap();

        let google = host.engine_by_name("Google").unwrap();
        assert!(google.hidden());
        assert_eq!(host.visible_engines().len(), 6);
        // The record survives in the defaults enumeration.
        assert_eq!(host.default_engines().len(), 7);
    }

    #[test]
    fn test_removing_user_engine_deletes_it() {
        let host = MemoryHost::default_profile();
        host.add_engine(&EngineDescriptor::new(
            "Example",
            "https://example.com/?q={searchTerms}",
        ))
        .unwrap();
        assert!(host.engine_by_name("Example").is_some());

        host.remove_engine("Example").unwrap();
        assert!(host.engine_by_name("Example").is_none());
    }

    #[test]
    fn test_duplicate_add_is_an_error() {
        let host = MemoryHost::default_profile();
        let result = host.add_engine(&EngineDescriptor::new(
            "Google",
            "https://example.com/?q={searchTerms}",
        ));
        assert!(matches!(result, Err(HostError::EngineExists(_))));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let host = MemoryHost::new();
        let result = host.add_engine(&EngineDescriptor::new("Broken", "not a url"));
        assert!(matches!(result, Err(HostError::InvalidUrl { .. })));
    }

    #[test]
    fn test_set_current_unknown_engine_is_an_error() {
        let host = MemoryHost::default_profile();
        let result = host.set_current_engine("AltaVista");
        assert!(matches!(result, Err(HostError::EngineNotFound(_))));
    }

    #[test]
    fn test_hiding_current_engine_falls_back_to_default() {
        let host = MemoryHost::default_profile();
        host.set_current_engine("Bing").unwrap();
        host.remove_engine("Bing").unwrap();
        assert_eq!(host.current_engine().unwrap().name(), "Google");
    }

    #[test]
    fn test_submission_encodes_terms() {
        let host = MemoryHost::default_profile();
        let google = host.engine_by_name("Google").unwrap();
        let submission = google
            .submission("rust lang", ResponseType::SearchHtml)
            .unwrap();
        assert_eq!(
            submission.url.as_str(),
            "https://www.google.com/search?q=rust%20lang"
        );
        assert!(submission.post_data.is_none());
    }

    #[test]
    fn test_post_submission_moves_query_into_body() {
        let host = MemoryHost::new();
        host.add_engine(
            &EngineDescriptor::new("PostEngine", "https://example.com/search?q={searchTerms}")
                .method(SubmissionMethod::Post),
        )
        .unwrap();

        let engine = host.engine_by_name("PostEngine").unwrap();
        let submission = engine.submission("terms", ResponseType::SearchHtml).unwrap();
        assert_eq!(submission.url.as_str(), "https://example.com/search");
        assert_eq!(submission.post_data.as_deref(), Some("q=terms"));
    }

    #[test]
    fn test_add_param_on_built_in_is_refused() {
        let host = MemoryHost::default_profile();
        let google = host.engine_by_name("Google").unwrap();
        let result = google.add_param("extra", "1", ResponseType::SearchHtml);
        assert!(matches!(result, Err(HostError::ReadOnlyEngine(_))));
    }

    #[test]
    fn test_add_param_appends_to_template() {
        let host = MemoryHost::new();
        host.add_engine(&EngineDescriptor::new(
            "Example",
            "https://example.com/?q={searchTerms}",
        ))
        .unwrap();

        let engine = host.engine_by_name("Example").unwrap();
        engine
            .add_param("safe", "on", ResponseType::SearchHtml)
            .unwrap();
        let submission = engine.submission("terms", ResponseType::SearchHtml).unwrap();
        assert_eq!(
            submission.url.as_str(),
            "https://example.com/?q=terms&safe=on"
        );
    }

    #[test]
    fn test_notifications_reach_subscribers() {
        let host = MemoryHost::default_profile();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let captured = Arc::clone(&seen);
        let id = host.subscribe(Box::new(move |notification| {
            captured
                .lock()
                .unwrap()
                .push((notification.signal, notification.engine.name()));
        }));

        host.set_current_engine("Bing").unwrap();
        host.remove_engine("Google").unwrap();

        host.unsubscribe(id);
        host.set_current_engine("Yahoo").unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (HostSignal::EngineCurrent, "Bing".to_string()),
                (HostSignal::EngineChanged, "Google".to_string()),
            ]
        );
    }
}
