//! Completed response bodies awaiting their consumer.

use std::collections::HashMap;

/// Bodies of finished transfers keyed by request URI
///
/// Only complete bodies are inserted; partial bytes stay in the slot until
/// the transfer ends. Reading an entry removes it.
#[derive(Debug, Default)]
pub struct FetchCache {
    entries: HashMap<String, String>,
}

impl FetchCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished body, replacing any unread body for the same URI
    pub fn insert(&mut self, uri: String, body: String) {
        self.entries.insert(uri, body);
    }

    /// Remove and return the body for `uri`
    pub fn take(&mut self, uri: &str) -> Option<String> {
        self.entries.remove(uri)
    }

    /// Whether an unread body exists for `uri`
    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    /// Number of unread bodies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is waiting to be read
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every unread body, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}
