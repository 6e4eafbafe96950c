//! The engine registry: single entry point over the host search service.
//!
//! All add/remove/lookup traffic goes through [`EngineRegistry`]; raw host
//! lifecycle notifications are classified and re-published as
//! [`EngineEvent`]s. Handles returned by lookups are constructed fresh on
//! every call and never cached.

mod handle;
mod suggest;

pub use handle::{EngineHandle, EngineSnapshot};
pub use suggest::SuggestOverrides;

use crate::events::{EngineEvent, EventBus, ListenerId};
use crate::host::{
    EngineDescriptor, HostEngine, HostError, HostNotification, HostSignal, SearchService,
    SubscriptionId,
};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, info};

/// Shared state reachable from the registry and from every handle it
/// constructs. The suggest override store lives here so handles observe the
/// same overrides without any process-wide global.
pub(crate) struct RegistryInner {
    pub(crate) host: Arc<dyn SearchService>,
    pub(crate) bus: EventBus,
    pub(crate) overrides: SuggestOverrides,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl RegistryInner {
    pub(crate) fn handle_for(inner: &Arc<Self>, engine: Arc<dyn HostEngine>) -> EngineHandle {
        EngineHandle::new(engine, Arc::clone(inner))
    }

    pub(crate) fn current(inner: &Arc<Self>) -> Option<EngineHandle> {
        inner
            .host
            .current_engine()
            .map(|engine| Self::handle_for(inner, engine))
    }

    pub(crate) fn default(inner: &Arc<Self>) -> Option<EngineHandle> {
        inner
            .host
            .default_engine()
            .map(|engine| Self::handle_for(inner, engine))
    }

    pub(crate) fn original_default(inner: &Arc<Self>) -> Option<EngineHandle> {
        inner
            .host
            .original_default_engine()
            .map(|engine| Self::handle_for(inner, engine))
    }

    /// Publish a normalized event, then the catch-all `changed` with the
    /// same engine payload. `changed` is always second and never alone.
    pub(crate) fn publish(inner: &Arc<Self>, event: EngineEvent, engine: Arc<dyn HostEngine>) {
        let handle = Self::handle_for(inner, engine);
        debug!("publishing {:?} for engine {}", event, handle.name());
        inner.bus.emit(event, &handle);
        inner.bus.emit(EngineEvent::Changed, &handle);
    }

    /// Classify one raw host notification into the normalized vocabulary.
    fn observe(inner: &Arc<Self>, notification: &HostNotification) {
        let engine = Arc::clone(&notification.engine);
        match notification.signal {
            HostSignal::EngineRemoved => Self::publish(inner, EngineEvent::Removed, engine),
            HostSignal::EngineAdded => Self::publish(inner, EngineEvent::Added, engine),
            HostSignal::EngineChanged => {
                // Hiding a built-in engine arrives as a plain change; from
                // the caller's perspective it is a removal. Anything else is
                // an ordering or in-place edit.
                if engine.hidden() {
                    Self::publish(inner, EngineEvent::Removed, engine);
                } else {
                    Self::publish(inner, EngineEvent::Order, engine);
                }
            }
            HostSignal::EngineCurrent => Self::publish(inner, EngineEvent::Current, engine),
        }
    }
}

/// Argument to [`EngineRegistry::add`]: a descriptor for a brand-new engine
/// or an existing (typically hidden) handle to re-show.
pub enum NewEngine {
    Descriptor(EngineDescriptor),
    Existing(EngineHandle),
}

impl From<EngineDescriptor> for NewEngine {
    fn from(descriptor: EngineDescriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl From<EngineHandle> for NewEngine {
    fn from(handle: EngineHandle) -> Self {
        Self::Existing(handle)
    }
}

/// Event-driven facade over the host search service.
pub struct EngineRegistry {
    inner: Arc<RegistryInner>,
}

impl EngineRegistry {
    /// Wrap `host` and subscribe to its notification channel.
    pub fn connect(host: Arc<dyn SearchService>) -> Self {
        let inner = Arc::new(RegistryInner {
            host: Arc::clone(&host),
            bus: EventBus::new(),
            overrides: SuggestOverrides::new(),
            subscription: Mutex::new(None),
        });
        let weak: Weak<RegistryInner> = Arc::downgrade(&inner);
        let id = host.subscribe(Box::new(move |notification| {
            if let Some(inner) = weak.upgrade() {
                RegistryInner::observe(&inner, notification);
            }
        }));
        *inner.subscription.lock().unwrap() = Some(id);
        info!("engine registry connected to host search service");
        Self { inner }
    }

    /// Detach from the host notification channel. Events stop firing;
    /// lookups keep working. Also runs on drop.
    pub fn disconnect(&self) {
        if let Some(id) = self.inner.subscription.lock().unwrap().take() {
            self.inner.host.unsubscribe(id);
            info!("engine registry disconnected from host search service");
        }
    }

    /// The active engine, or `None` when the host has no visible engines.
    pub fn current_engine(&self) -> Option<EngineHandle> {
        RegistryInner::current(&self.inner)
    }

    /// Ask the host to make `engine` active. Unknown engines are a
    /// host-level error, propagated unmodified.
    pub fn set_current_engine(&self, engine: &EngineHandle) -> Result<(), HostError> {
        self.inner.host.set_current_engine(&engine.name())
    }

    /// The default visible engine. May differ from
    /// [`original_default_engine`](Self::original_default_engine) when the
    /// user has hidden the factory default.
    pub fn default_engine(&self) -> Option<EngineHandle> {
        RegistryInner::default(&self.inner)
    }

    /// The factory-default engine, hidden or not.
    pub fn original_default_engine(&self) -> Option<EngineHandle> {
        RegistryInner::original_default(&self.inner)
    }

    /// Add an engine, or re-show a hidden one.
    ///
    /// Re-showing flips the hidden flag and announces `added` itself,
    /// synchronously; creating a new engine delegates to the host and
    /// relies on the host's own notification instead. The two paths must
    /// stay asymmetric: the host sends no notification for a visibility
    /// write. A descriptor carrying a suggestion template gets it
    /// registered through the suggest shim once the engine exists.
    pub fn add(&self, engine: impl Into<NewEngine>) -> Result<(), HostError> {
        match engine.into() {
            NewEngine::Existing(handle) => {
                if handle.hidden() {
                    handle.set_hidden(false);
                    debug!("re-showing hidden engine {}", handle.name());
                    RegistryInner::publish(
                        &self.inner,
                        EngineEvent::Added,
                        handle.host_engine(),
                    );
                }
                Ok(())
            }
            NewEngine::Descriptor(descriptor) => {
                self.inner.host.add_engine(&descriptor)?;
                if let Some(suggest) = &descriptor.suggest {
                    if let Some(handle) = self.get(&descriptor.name) {
                        handle.add_suggest(suggest);
                    }
                }
                Ok(())
            }
        }
    }

    /// Remove an engine. The host decides the outcome: built-ins are merely
    /// hidden, user-installed engines are deleted. The matching `removed`
    /// event arrives via the host notification; any suggest override for
    /// the engine is evicted here.
    pub fn remove(&self, engine: &EngineHandle) -> Result<(), HostError> {
        let name = engine.name();
        self.inner.host.remove_engine(&name)?;
        self.inner.overrides.remove(&name);
        Ok(())
    }

    /// Look up an engine by exact name first, then by alias. Absence is
    /// `None`, never an error.
    pub fn get(&self, name_or_alias: &str) -> Option<EngineHandle> {
        self.inner
            .host
            .engine_by_name(name_or_alias)
            .or_else(|| self.inner.host.engine_by_alias(name_or_alias))
            .map(|engine| RegistryInner::handle_for(&self.inner, engine))
    }

    /// Every factory-shipped engine, visible or not, in host order.
    pub fn default_engines(&self) -> Vec<EngineHandle> {
        self.inner
            .host
            .default_engines()
            .into_iter()
            .map(|engine| RegistryInner::handle_for(&self.inner, engine))
            .collect()
    }

    /// Every visible engine, in host display order.
    pub fn visible_engines(&self) -> Vec<EngineHandle> {
        self.inner
            .host
            .visible_engines()
            .into_iter()
            .map(|engine| RegistryInner::handle_for(&self.inner, engine))
            .collect()
    }

    /// Subscribe `callback` to every future publication of `event`.
    pub fn on<F>(&self, event: EngineEvent, callback: F) -> ListenerId
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.inner.bus.on(event, callback)
    }

    /// Subscribe for a single firing of `event`.
    pub fn once<F>(&self, event: EngineEvent, callback: F) -> ListenerId
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.inner.bus.once(event, callback)
    }

    /// Remove a listener registered with [`on`](Self::on) or
    /// [`once`](Self::once).
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.bus.off(id)
    }
}

impl Drop for EngineRegistry {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;
    use std::sync::Mutex;

    const YELP_URL: &str = "http://www.yelp.ca/search?ns=1&find_desc={searchTerms}&find_loc={geo:name}";
    const YELP_SUGGEST_URL: &str = "http://www.yelp.ca/search_suggest?prefix={searchTerms}&loc={geo:name}";

    fn registry() -> EngineRegistry {
        EngineRegistry::connect(Arc::new(MemoryHost::default_profile()))
    }

    fn yelp_descriptor() -> EngineDescriptor {
        EngineDescriptor::new("Yelp", YELP_URL)
            .alias("YelpAlias")
            .description("Yelp - Connecting people with great local businesses")
    }

    fn record_events(registry: &EngineRegistry) -> Arc<Mutex<Vec<(EngineEvent, String)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for event in [
            EngineEvent::Added,
            EngineEvent::Removed,
            EngineEvent::Order,
            EngineEvent::Current,
            EngineEvent::Suggest,
            EngineEvent::Changed,
        ] {
            let log = Arc::clone(&log);
            registry.on(event, move |engine| {
                log.lock().unwrap().push((event, engine.name()));
            });
        }
        log
    }

    #[test]
    fn test_get_by_name_and_alias() {
        let registry = registry();
        assert!(registry.get("Google").is_some());
        assert!(registry.get("AltaVista").is_none());

        registry.add(yelp_descriptor()).unwrap();
        let yelp = registry.get("YelpAlias").unwrap();
        assert_eq!(yelp.name(), "Yelp");
        assert_eq!(yelp.alias().as_deref(), Some("YelpAlias"));
    }

    #[test]
    fn test_add_and_remove_user_engine() {
        let registry = registry();
        registry.add(yelp_descriptor()).unwrap();

        let yelp = registry.get("Yelp").unwrap();
        assert_eq!(
            yelp.search_url("search").as_deref(),
            Some("http://www.yelp.ca/search?ns=1&find_desc=search&find_loc={geo:name}")
        );

        registry.remove(&yelp).unwrap();
        assert!(registry.get("Yelp").is_none());
        assert!(registry.get("YelpAlias").is_none());
    }

    #[test]
    fn test_hidden_engines_stay_in_defaults_but_not_visible() {
        let registry = registry();
        let google = registry.get("Google").unwrap();

        registry.remove(&google).unwrap();

        let google = registry.get("Google").unwrap();
        assert!(google.hidden());
        assert!(!google.is_default());
        assert!(registry.default_engines().contains(&google));
        assert!(!registry.visible_engines().contains(&google));
    }

    #[test]
    fn test_remove_then_add_restores_built_in() {
        let registry = registry();
        let google = registry.get("Google").unwrap();
        let visible_before = registry.visible_engines().len();

        registry.remove(&google).unwrap();
        assert_eq!(registry.visible_engines().len(), visible_before - 1);
        // The next visible engine takes over as default; the original
        // default is unchanged.
        assert_eq!(registry.default_engine().unwrap().name(), "Yahoo");
        assert_eq!(registry.original_default_engine().unwrap().name(), "Google");

        registry.add(registry.get("Google").unwrap()).unwrap();
        assert_eq!(registry.visible_engines().len(), visible_before);
        assert_eq!(registry.default_engine().unwrap().name(), "Google");
        assert_eq!(registry.original_default_engine().unwrap().name(), "Google");
    }

    #[test]
    fn test_hiding_built_in_publishes_removed() {
        let registry = registry();
        let log = record_events(&registry);

        let google = registry.get("Google").unwrap();
        registry.remove(&google).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (EngineEvent::Removed, "Google".to_string()),
                (EngineEvent::Changed, "Google".to_string()),
            ]
        );
    }

    #[test]
    fn test_re_show_is_self_announced() {
        let registry = registry();
        let google = registry.get("Google").unwrap();
        registry.remove(&google).unwrap();

        let log = record_events(&registry);
        registry.add(registry.get("Google").unwrap()).unwrap();

        // No host notification is involved; the registry announces the
        // re-show itself.
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (EngineEvent::Added, "Google".to_string()),
                (EngineEvent::Changed, "Google".to_string()),
            ]
        );
    }

    #[test]
    fn test_adding_visible_engine_again_is_a_no_op() {
        let registry = registry();
        let log = record_events(&registry);

        registry.add(registry.get("Google").unwrap()).unwrap();
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(registry.visible_engines().len(), 7);
    }

    #[test]
    fn test_creation_is_announced_via_host_notification() {
        let registry = registry();
        let log = record_events(&registry);

        registry.add(yelp_descriptor()).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (EngineEvent::Added, "Yelp".to_string()),
                (EngineEvent::Changed, "Yelp".to_string()),
            ]
        );
    }

    #[test]
    fn test_descriptor_suggest_goes_through_the_shim() {
        let registry = registry();
        let log = record_events(&registry);

        registry
            .add(yelp_descriptor().suggest(YELP_SUGGEST_URL))
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                (EngineEvent::Added, "Yelp".to_string()),
                (EngineEvent::Changed, "Yelp".to_string()),
                (EngineEvent::Suggest, "Yelp".to_string()),
                (EngineEvent::Changed, "Yelp".to_string()),
            ]
        );

        let yelp = registry.get("Yelp").unwrap();
        assert_eq!(
            yelp.suggestion("search").as_deref(),
            Some("http://www.yelp.ca/search_suggest?prefix=search&loc={geo:name}")
        );
    }

    #[test]
    fn test_remove_evicts_suggest_override() {
        let registry = registry();
        registry
            .add(yelp_descriptor().suggest(YELP_SUGGEST_URL))
            .unwrap();
        assert!(registry.inner.overrides.contains("Yelp"));

        let yelp = registry.get("Yelp").unwrap();
        registry.remove(&yelp).unwrap();
        assert!(registry.inner.overrides.is_empty());
    }

    #[test]
    fn test_suggestion_for_built_in_after_add_suggest() {
        let registry = registry();
        let twitter = registry.get("Twitter").unwrap();
        assert!(twitter.read_only());
        assert_eq!(twitter.suggestion("search"), None);

        twitter.add_suggest("https://twitter.example/suggest?q={searchTerms}");
        assert_eq!(
            twitter.suggestion("rust lang").as_deref(),
            Some("https://twitter.example/suggest?q=rust%20lang")
        );
    }

    #[test]
    fn test_google_default_profile_suggestion() {
        let registry = registry();
        let google = registry.get("Google").unwrap();
        assert!(google.read_only());
        assert_eq!(
            google.suggestion("search").as_deref(),
            Some("https://www.google.com/complete/search?client=firefox&q=search")
        );
    }

    #[test]
    fn test_native_suggest_urls_resolve() {
        let registry = registry();
        let expected = [
            (
                "Wikipedia (en)",
                "http://en.wikipedia.org/w/api.php?action=opensearch&search=search",
            ),
            (
                "Google",
                "https://www.google.com/complete/search?client=firefox&q=search",
            ),
            (
                "Yahoo",
                "http://ff.search.yahoo.com/gossip?output=fxjson&command=search",
            ),
            ("Bing", "http://api.bing.com/osjson.aspx?query=search&form=OSDJAS"),
            ("eBay", "http://anywhere.ebay.com/services/suggest/?s=0&q=search"),
        ];
        for (name, url) in expected {
            let engine = registry.get(name).unwrap();
            assert_eq!(engine.suggestion("search").as_deref(), Some(url), "{name}");
        }
    }

    #[test]
    fn test_set_current_engine_fires_exactly_one_current_event() {
        let registry = registry();
        let count = Arc::new(Mutex::new(0));
        let seen = Arc::new(Mutex::new(None));

        let captured_count = Arc::clone(&count);
        let captured_seen = Arc::clone(&seen);
        registry.on(EngineEvent::Current, move |engine| {
            *captured_count.lock().unwrap() += 1;
            *captured_seen.lock().unwrap() = Some(engine.name());
        });

        let amazon = registry.get("Amazon.com").unwrap();
        registry.set_current_engine(&amazon).unwrap();

        // The event has already fired and the accessor agrees: the whole
        // exchange is synchronous.
        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(seen.lock().unwrap().as_deref(), Some("Amazon.com"));
        assert_eq!(registry.current_engine().unwrap().name(), "Amazon.com");
        assert!(amazon.is_current());
    }

    #[test]
    fn test_set_current_engine_unknown_propagates_host_error() {
        let registry = registry();
        registry.add(yelp_descriptor()).unwrap();
        let yelp = registry.get("Yelp").unwrap();
        registry.remove(&yelp).unwrap();

        let result = registry.set_current_engine(&yelp);
        assert!(matches!(result, Err(HostError::EngineNotFound(_))));
    }

    #[test]
    fn test_once_listener_stops_after_one_firing() {
        let registry = registry();
        let count = Arc::new(Mutex::new(0));

        let captured = Arc::clone(&count);
        registry.once(EngineEvent::Changed, move |_| {
            *captured.lock().unwrap() += 1;
        });

        let amazon = registry.get("Amazon.com").unwrap();
        registry.set_current_engine(&amazon).unwrap();
        let bing = registry.get("Bing").unwrap();
        registry.set_current_engine(&bing).unwrap();

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_disconnect_stops_event_delivery() {
        let registry = registry();
        let log = record_events(&registry);

        registry.disconnect();
        let amazon = registry.get("Amazon.com").unwrap();
        registry.set_current_engine(&amazon).unwrap();

        assert!(log.lock().unwrap().is_empty());
        // Lookups keep working after disconnect.
        assert_eq!(registry.current_engine().unwrap().name(), "Amazon.com");
    }
}
