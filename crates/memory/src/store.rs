//! In-process memory store with JSON-file persistence.
//!
//! Items live in insertion order and are unique by exact content. Lookup is
//! literal: a case-insensitive substring test of the query or its plural or
//! singular spelling, no scoring and no embeddings.
//! The whole store is written to and read from disk as one JSON list of
//! `{content, metadata}` objects.

use std::path::Path;

use dayloop_core::error::MemoryError;
use dayloop_core::memory::MemoryItem;
use tracing::debug;

/// Default number of items returned by [`MemoryStore::retrieve`].
pub const DEFAULT_RETRIEVE_LIMIT: usize = 5;

/// Shortest word [`keywords`] keeps.
const MIN_KEYWORD_LEN: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Vec<MemoryItem>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fact. Returns `false` when identical content is already stored.
    pub fn add(
        &mut self,
        content: impl Into<String>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> bool {
        let content = content.into();
        if self.items.iter().any(|item| item.content == content) {
            return false;
        }
        self.items.push(MemoryItem { content, metadata });
        true
    }

    /// Items whose content contains `query`, ignoring case, in insertion
    /// order, at most `limit` of them. "grocery" also finds "groceries".
    pub fn retrieve(&self, query: &str, limit: usize) -> Vec<&MemoryItem> {
        let needles = spellings(&query.to_lowercase());
        self.items
            .iter()
            .filter(|item| {
                let content = item.content.to_lowercase();
                needles.iter().any(|n| content.contains(n.as_str()))
            })
            .take(limit)
            .collect()
    }

    /// Items relevant to a free-text request: every keyword of the request
    /// is retrieved in turn and the matches merged without duplicates.
    pub fn recall(&self, request: &str, limit: usize) -> Vec<&MemoryItem> {
        let mut recalled: Vec<&MemoryItem> = Vec::new();
        for word in keywords(request) {
            for item in self.retrieve(&word, limit) {
                if recalled.len() == limit {
                    return recalled;
                }
                if !recalled.iter().any(|r| std::ptr::eq(*r, item)) {
                    recalled.push(item);
                }
            }
        }
        recalled
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[MemoryItem] {
        &self.items
    }

    /// Write the whole store to `path`, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<(), MemoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(&self.items).map_err(|e| {
            MemoryError::Storage(format!("Failed to serialize memory items: {e}"))
        })?;

        std::fs::write(path, content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;

        debug!(path = %path.display(), count = self.items.len(), "Memory persisted");
        Ok(())
    }

    /// Replace the store's contents with the list stored at `path`.
    ///
    /// A missing file leaves the store untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), MemoryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read memory file: {e}"
                )));
            }
        };

        let items: Vec<MemoryItem> =
            serde_json::from_str(&content).map_err(|e| MemoryError::Corrupted {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.items.clear();
        for item in items {
            self.add(item.content, item.metadata);
        }

        debug!(path = %path.display(), count = self.items.len(), "Memory loaded");
        Ok(())
    }
}

/// The query plus its regular English plural/singular counterpart.
fn spellings(query: &str) -> Vec<String> {
    let mut out = vec![query.to_string()];
    if query.is_empty() {
        return out;
    }
    if let Some(stem) = query.strip_suffix("ies") {
        out.push(format!("{stem}y"));
    } else if let Some(stem) = query.strip_suffix('y') {
        out.push(format!("{stem}ies"));
    } else if let Some(stem) = query.strip_suffix('s').filter(|s| !s.ends_with('s')) {
        out.push(stem.to_string());
    }
    out
}

/// Distinct lower-case words of a request worth looking up, in order of
/// first appearance.
pub fn keywords(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
    {
        if !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};
    use tempfile::TempDir;

    fn meta(kind: &str) -> Map<String, serde_json::Value> {
        let mut m = Map::new();
        m.insert("kind".into(), json!(kind));
        m
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = MemoryStore::new();
        assert!(store.add("Buy groceries tomorrow", Map::new()));
        assert!(!store.add("Buy groceries tomorrow", meta("note")));
        assert_eq!(store.len(), 1);
        assert!(store.items()[0].metadata.is_empty());
    }

    #[test]
    fn add_is_case_sensitive() {
        let mut store = MemoryStore::new();
        store.add("walk the dog", Map::new());
        store.add("Walk the dog", Map::new());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn retrieve_matches_substring_ignoring_case() {
        let mut store = MemoryStore::new();
        store.add("Buy groceries tomorrow", Map::new());
        store.add("Dentist at 3pm", Map::new());

        let found = store.retrieve("grocery", DEFAULT_RETRIEVE_LIMIT);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "Buy groceries tomorrow");

        assert_eq!(store.retrieve("DENTIST", DEFAULT_RETRIEVE_LIMIT).len(), 1);
        assert!(store.retrieve("doctor", DEFAULT_RETRIEVE_LIMIT).is_empty());
    }

    #[test]
    fn spellings_cover_regular_plurals() {
        assert_eq!(spellings("grocery"), vec!["grocery", "groceries"]);
        assert_eq!(spellings("groceries"), vec!["groceries", "grocery"]);
        assert_eq!(spellings("todos"), vec!["todos", "todo"]);
        assert_eq!(spellings("glass"), vec!["glass"]);
    }

    #[test]
    fn retrieve_keeps_insertion_order_and_limit() {
        let mut store = MemoryStore::new();
        for i in 0..8 {
            store.add(format!("note {i}"), Map::new());
        }
        let found = store.retrieve("note", 3);
        let contents: Vec<&str> = found.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(contents, vec!["note 0", "note 1", "note 2"]);
    }

    #[test]
    fn clear_empties_store() {
        let mut store = MemoryStore::new();
        store.add("a", Map::new());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn keywords_are_distinct_lowercase_and_long_enough() {
        assert_eq!(
            keywords("Plan my Monday: gym, then MONDAY groceries."),
            vec!["plan", "monday", "then", "groceries"]
        );
    }

    #[test]
    fn recall_merges_without_duplicates() {
        let mut store = MemoryStore::new();
        store.add("I go to the gym every morning", meta("preference"));
        store.add("Mornings are for deep work", meta("preference"));
        store.add("Unrelated", Map::new());

        let recalled = store.recall("schedule morning work", 5);
        let contents: Vec<&str> = recalled.iter().map(|i| i.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["I go to the gym every morning", "Mornings are for deep work"]
        );
    }

    #[test]
    fn recall_respects_limit() {
        let mut store = MemoryStore::new();
        for i in 0..4 {
            store.add(format!("work item {i}"), Map::new());
        }
        assert_eq!(store.recall("work", 2).len(), 2);
    }

    #[test]
    fn persist_and_load_preserve_order_and_metadata() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut store = MemoryStore::new();
        store.add("second", meta("preference"));
        store.add("first", Map::new());
        store.persist(&path).unwrap();

        let mut loaded = MemoryStore::new();
        loaded.add("stale", Map::new());
        loaded.load(&path).unwrap();
        assert_eq!(loaded.items(), store.items());
        assert_eq!(loaded.items()[0].metadata["kind"], "preference");
    }

    #[test]
    fn load_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut store = MemoryStore::new();
        store.add("kept", Map::new());
        store.load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn load_corrupted_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not a list").unwrap();

        let mut store = MemoryStore::new();
        assert!(matches!(
            store.load(&path),
            Err(MemoryError::Corrupted { .. })
        ));
    }
}
