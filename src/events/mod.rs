//! Normalized engine lifecycle events.
//!
//! The registry classifies raw host notifications into this closed event
//! vocabulary and publishes them synchronously to subscribed listeners.

use crate::registry::EngineHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// The normalized events published by [`EngineRegistry`](crate::EngineRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEvent {
    /// An engine became visible, either freshly created or un-hidden.
    Added,
    /// An engine became hidden (built-in) or was deleted (user-added).
    Removed,
    /// The visible-engine ordering changed, or an in-place edit occurred.
    Order,
    /// The active engine changed.
    Current,
    /// A suggestion-URL override was registered for an engine.
    Suggest,
    /// Catch-all published right after every other event, with the same
    /// engine payload. Never published on its own.
    Changed,
}

/// Identifier returned by [`EventBus::on`] and [`EventBus::once`]; pass it
/// to [`EventBus::off`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Arc<dyn Fn(&EngineHandle) + Send + Sync>;

struct Registration {
    id: ListenerId,
    event: EngineEvent,
    once: bool,
    callback: Callback,
}

/// Synchronous publish/subscribe bus over [`EngineEvent`].
///
/// Listeners for an event run in registration order, on the thread that
/// published the event. The listener list is released before any callback
/// runs, so a listener may subscribe, unsubscribe, or trigger another
/// publication without deadlocking.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback` to every future publication of `event`.
    pub fn on<F>(&self, event: EngineEvent, callback: F) -> ListenerId
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.register(event, false, Arc::new(callback))
    }

    /// Subscribe `callback` to the next publication of `event` only.
    pub fn once<F>(&self, event: EngineEvent, callback: F) -> ListenerId
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.register(event, true, Arc::new(callback))
    }

    /// Remove a listener. Returns false when the id is unknown or was
    /// already consumed by a `once` firing.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap();
        let before = listeners.len();
        listeners.retain(|registration| registration.id != id);
        listeners.len() != before
    }

    /// Publish `event` to every matching listener.
    pub fn emit(&self, event: EngineEvent, engine: &EngineHandle) {
        // One-shot listeners are dropped from the list before their callback
        // runs, so a nested publication cannot fire them twice.
        let ready: Vec<Callback> = {
            let mut listeners = self.listeners.lock().unwrap();
            let ready = listeners
                .iter()
                .filter(|registration| registration.event == event)
                .map(|registration| Arc::clone(&registration.callback))
                .collect();
            listeners.retain(|registration| !(registration.once && registration.event == event));
            ready
        };
        for callback in ready {
            callback(engine);
        }
    }

    /// Number of live listeners, all events combined.
    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, event: EngineEvent, once: bool, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().unwrap().push(Registration {
            id,
            event,
            once,
            callback,
        });
        id
    }
}
