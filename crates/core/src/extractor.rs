//! Content extraction trait: turn a URL, a search query or a local file
//! into plain text for persona analysis.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    File,
    Search,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::File => "file",
            SourceType::Search => "search",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub title: String,

    /// URL or file path the content came from
    pub source: String,

    pub content: String,
    pub source_type: SourceType,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ExtractedDocument {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extractor name (e.g., "jina", "firecrawl").
    fn name(&self) -> &str;

    async fn extract_url(&self, url: &str) -> std::result::Result<ExtractedDocument, ExtractError>;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<Vec<ExtractedDocument>, ExtractError>;
}
