//! Dense index assignment for event and track definitions

use crate::format::{EVENT_DEFINITION_ENTRY_LEN, TRACK_DEFINITION_ENTRY_LEN};
use fnv::FnvHashMap;

/// Assigns zero-based indices to distinct keys in first-seen order
///
/// Lookups go through a hash map while a parallel `Vec` keeps the
/// index -> key order used when the definitions are written out.
#[derive(Debug, Clone)]
pub struct DefinitionIndexer {
    indices: FnvHashMap<String, u32>,
    keys: Vec<String>,
    entry_len: usize,
}

impl DefinitionIndexer {
    /// Create an indexer whose section grows by `entry_len` bytes per key
    pub fn new(entry_len: usize) -> Self {
        Self {
            indices: FnvHashMap::default(),
            keys: Vec::new(),
            entry_len,
        }
    }

    /// Indexer for event type names (12-byte event definition entries)
    pub fn event_definitions() -> Self {
        Self::new(EVENT_DEFINITION_ENTRY_LEN)
    }

    /// Indexer for track identifiers (8-byte track definition entries)
    pub fn track_definitions() -> Self {
        Self::new(TRACK_DEFINITION_ENTRY_LEN)
    }

    /// Index of `key`, assigning the next free index on first occurrence
    pub fn index_of(&mut self, key: &str) -> u32 {
        if let Some(&index) = self.indices.get(key) {
            return index;
        }
        let index = self.keys.len() as u32;
        self.indices.insert(key.to_string(), index);
        self.keys.push(key.to_string());
        index
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.indices.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Accumulated section body length in bytes
    pub fn byte_len(&self) -> usize {
        self.keys.len() * self.entry_len
    }

    /// `(index, key)` pairs in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(index, key)| (index as u32, key.as_str()))
    }
}
