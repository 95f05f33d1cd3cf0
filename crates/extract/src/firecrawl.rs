//! Firecrawl scraper with Tavily search.
//!
//! Firecrawl renders JavaScript-heavy pages and returns markdown; Tavily
//! answers search queries with page content included. The Firecrawl key is
//! required, the Tavily key only for `search`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use opentwin_core::{ContentExtractor, ExtractError, ExtractedDocument, SourceType};
use serde::Deserialize;
use tracing::debug;

const FIRECRAWL_URL: &str = "https://api.firecrawl.dev/v1/scrape";
const TAVILY_URL: &str = "https://api.tavily.com/search";

pub struct FirecrawlExtractor {
    firecrawl_key: String,
    tavily_key: Option<String>,
    client: reqwest::Client,
}

impl FirecrawlExtractor {
    pub fn new(firecrawl_key: Option<String>, tavily_key: Option<String>) -> Result<Self, ExtractError> {
        let firecrawl_key = firecrawl_key
            .ok_or_else(|| ExtractError::NotConfigured("FIRECRAWL_API_KEY is required".into()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Ok(Self { firecrawl_key, tavily_key, client })
    }

    pub fn has_search(&self) -> bool {
        self.tavily_key.is_some()
    }

    fn scrape_to_document(url: &str, resp: ScrapeResponse) -> Result<ExtractedDocument, ExtractError> {
        let data = match (resp.success, resp.data) {
            (true, Some(data)) => data,
            _ => {
                return Err(ExtractError::RequestFailed {
                    url: url.to_string(),
                    reason: resp.error.unwrap_or_else(|| "scrape unsuccessful".into()),
                });
            }
        };

        let mut metadata = BTreeMap::new();
        let mut title = String::new();
        if let Some(serde_json::Value::Object(map)) = data.metadata {
            for (key, value) in map {
                if let serde_json::Value::String(s) = value {
                    if key == "title" {
                        title = s.clone();
                    }
                    metadata.insert(key, s);
                }
            }
        }

        Ok(ExtractedDocument {
            title,
            source: url.to_string(),
            content: data.markdown.unwrap_or_default(),
            source_type: SourceType::Web,
            metadata,
        })
    }

    fn search_to_documents(resp: SearchResponse) -> Vec<ExtractedDocument> {
        resp.results
            .into_iter()
            .map(|hit| {
                let content = hit.raw_content.filter(|c| !c.is_empty()).unwrap_or(hit.content);
                let mut metadata = BTreeMap::new();
                metadata.insert("score".to_string(), hit.score.to_string());
                ExtractedDocument {
                    title: hit.title,
                    source: hit.url,
                    content,
                    source_type: SourceType::Search,
                    metadata,
                }
            })
            .collect()
    }
}

#[async_trait]
impl ContentExtractor for FirecrawlExtractor {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn extract_url(&self, url: &str) -> Result<ExtractedDocument, ExtractError> {
        let failed = |reason: String| ExtractError::RequestFailed { url: url.to_string(), reason };
        debug!(url, "Firecrawl scrape request");

        let response = self
            .client
            .post(FIRECRAWL_URL)
            .bearer_auth(&self.firecrawl_key)
            .json(&serde_json::json!({ "url": url, "formats": ["markdown"] }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("HTTP {status}: {body}")));
        }

        let parsed: ScrapeResponse = response.json().await.map_err(|e| failed(e.to_string()))?;
        Self::scrape_to_document(url, parsed)
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ExtractedDocument>, ExtractError> {
        let key = self
            .tavily_key
            .as_deref()
            .ok_or_else(|| ExtractError::NotConfigured("TAVILY_API_KEY is required for search".into()))?;
        let failed = |reason: String| ExtractError::RequestFailed { url: TAVILY_URL.to_string(), reason };

        let response = self
            .client
            .post(TAVILY_URL)
            .bearer_auth(key)
            .json(&serde_json::json!({
                "query": query,
                "max_results": max_results,
                "include_raw_content": true,
            }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| failed(e.to_string()))?;
        Ok(Self::search_to_documents(parsed))
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    raw_content: Option<String>,
    #[serde(default)]
    score: f64,
}
