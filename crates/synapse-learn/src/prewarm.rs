use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("context source failed: {0}")]
pub struct ContextError(pub String);

/// Fetches context fragments for a synthetic query ahead of time
pub trait ContextSource: Send + Sync {
    fn fetch(&self, query: &str) -> Result<Vec<String>, ContextError>;
}

/// Pop-once store of pre-fetched context per category.
///
/// A read removes the entry, so the same fragments are never served twice.
#[derive(Debug, Default)]
pub struct PrewarmCache {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl PrewarmCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was cached for `category`
    pub fn store(&self, category: &str, fragments: Vec<String>) {
        self.lock().insert(category.to_string(), fragments);
    }

    /// Remove and return the fragments for `category`, empty if none
    pub fn take_once(&self, category: &str) -> Vec<String> {
        self.lock().remove(category).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic mid-insert leaves the map itself intact
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
