//! Memory item: a short text fact the agent keeps for the current run.
//!
//! Memory here is deliberately literal: items are matched by substring, never
//! by embedding similarity. The store itself lives in `dayloop-memory`.

use serde::{Deserialize, Serialize};

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// The text of the fact. Unique within a store.
    pub content: String,

    /// Free-form scalar metadata (kind, source, timestamps)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl MemoryItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
