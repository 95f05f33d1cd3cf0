//! Long-term store trait and the records it returns.
//!
//! The conversation core only depends on this narrow contract: add a
//! document, search for the most relevant ones, and report counters.
//! Ranking quality is entirely the store's business.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Counters reported by a store. Keys are stable strings, values are JSON.
pub type MemoryStats = BTreeMap<String, serde_json::Value>;

/// A record returned by a long-term store search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Identifier assigned by the store
    pub id: String,

    /// The indexed text
    pub content: String,

    /// Where the content came from (URL, file path, "conversation", ...)
    pub source: String,

    /// Higher is more relevant. Only comparable within one search call.
    #[serde(default)]
    pub relevance_score: f32,

    /// Free-form string tags (content_type, persona, timestamp, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            relevance_score: 0.0,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// The long-term memory delegate.
///
/// Implementations: in-memory (tests, ephemeral sessions) and JSONL file.
#[async_trait]
pub trait LongTermStore: Send + Sync {
    /// The store name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Index a document. Identical content added twice yields two records.
    async fn add(
        &self,
        content: &str,
        source: &str,
        metadata: BTreeMap<String, String>,
    ) -> std::result::Result<String, MemoryError>;

    /// At most `k` records, most relevant first. Empty when nothing matches.
    async fn search(&self, query: &str, k: usize)
    -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Best-effort counters. Never fails; degrade to a partial map instead.
    async fn stats(&self) -> MemoryStats;

    /// Remove every record.
    async fn clear(&self) -> std::result::Result<(), MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialization_skips_empty_metadata() {
        let record = MemoryRecord::new("mem_001", "Rates stay higher", "speech.md", BTreeMap::new());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("Rates stay higher"));
        assert!(!json.contains("metadata"));
    }

    #[test]
    fn record_deserializes_without_score() {
        let json = r#"{"id":"1","content":"c","source":"s","created_at":"2024-01-01T00:00:00Z"}"#;
        let record: MemoryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.relevance_score, 0.0);
        assert!(record.metadata.is_empty());
    }
}
