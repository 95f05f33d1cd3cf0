//! In-memory store — useful for testing and ephemeral sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use opentwin_core::{LongTermStore, MemoryError, MemoryRecord, MemoryStats};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::scoring;

/// Keeps records in a Vec; nothing survives the process.
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LongTermStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn add(
        &self,
        content: &str,
        source: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String, MemoryError> {
        let id = Uuid::new_v4().to_string();
        let record = MemoryRecord::new(id.clone(), content, source, metadata);
        self.records.write().await.push(record);
        Ok(id)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(scoring::rank(records.iter(), query, k))
    }

    async fn stats(&self) -> MemoryStats {
        let records = self.records.read().await;
        MemoryStats::from([
            ("backend".to_string(), serde_json::json!(self.name())),
            ("total_memories".to_string(), serde_json::json!(records.len())),
        ])
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_search() {
        let store = InMemoryStore::new();
        store.add("Rust is a systems language", "notes.md", BTreeMap::new()).await.unwrap();
        store.add("Python is interpreted", "notes.md", BTreeMap::new()).await.unwrap();

        let results = store.search("rust language", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Rust"));
        assert_eq!(results[0].source, "notes.md");
    }

    #[tokio::test]
    async fn duplicates_are_kept() {
        let store = InMemoryStore::new();
        let a = store.add("same", "s", BTreeMap::new()).await.unwrap();
        let b = store.add("same", "s", BTreeMap::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.stats().await["total_memories"], 2);
    }

    #[tokio::test]
    async fn empty_store_searches_to_nothing() {
        let store = InMemoryStore::new();
        assert!(store.search("anything at all", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_empties() {
        let store = InMemoryStore::new();
        store.add("Memory 1", "s", BTreeMap::new()).await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.stats().await["total_memories"], 0);
    }
}
