//! Suggestion-URL overrides for engines the host will not mutate.

use crate::expand_template;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory map from engine name to a suggestion-URL template.
///
/// Built-in engines refuse parameter mutation, so a suggestion endpoint
/// registered for one lives here instead of on the host record. Entries are
/// evicted when the corresponding engine is removed and never survive the
/// process. Insertion does not check that an engine of that name exists.
#[derive(Debug, Default)]
pub struct SuggestOverrides {
    map: Mutex<HashMap<String, String>>,
}

impl SuggestOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `template` as the suggestion URL for `name`, replacing any
    /// previous entry.
    pub fn insert(&self, name: impl Into<String>, template: impl Into<String>) {
        self.map.lock().unwrap().insert(name.into(), template.into());
    }

    /// Whether an override exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.map.lock().unwrap().contains_key(name)
    }

    /// Expand the override for `name` with the percent-encoded `terms`.
    pub fn expand(&self, name: &str, terms: &str) -> Option<String> {
        self.map
            .lock()
            .unwrap()
            .get(name)
            .map(|template| expand_template(template, terms))
    }

    /// Drop the override for `name`, returning the stored template.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.map.lock().unwrap().remove(name)
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
