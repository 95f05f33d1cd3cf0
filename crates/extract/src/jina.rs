//! Jina AI Reader extractor.
//!
//! `r.jina.ai/<url>` returns a page as markdown and `s.jina.ai/?q=` returns
//! search results as one markdown document. A key is optional and only
//! raises the rate limit.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use opentwin_core::{ContentExtractor, ExtractError, ExtractedDocument, SourceType};
use tracing::debug;

use crate::markdown_title;

const READER_URL: &str = "https://r.jina.ai/";
const SEARCH_URL: &str = "https://s.jina.ai/";

pub struct JinaExtractor {
    api_key: Option<String>,
    reader_url: String,
    search_url: String,
    client: reqwest::Client,
}

impl JinaExtractor {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            reader_url: READER_URL.into(),
            search_url: SEARCH_URL.into(),
            client,
        }
    }

    /// Point both endpoints somewhere else (proxies, tests).
    pub fn with_endpoints(mut self, reader_url: impl Into<String>, search_url: impl Into<String>) -> Self {
        self.reader_url = reader_url.into();
        self.search_url = search_url.into();
        self
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn fetch_text(&self, builder: reqwest::RequestBuilder, url: &str) -> Result<String, ExtractError> {
        let failed = |reason: String| ExtractError::RequestFailed { url: url.to_string(), reason };

        let response = builder.send().await.map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }
        response.text().await.map_err(|e| failed(e.to_string()))
    }
}

#[async_trait]
impl ContentExtractor for JinaExtractor {
    fn name(&self) -> &str {
        "jina"
    }

    async fn extract_url(&self, url: &str) -> Result<ExtractedDocument, ExtractError> {
        let reader = format!("{}{url}", self.reader_url);
        debug!(url, "Jina reader request");
        let content = self.fetch_text(self.request(&reader), url).await?;

        Ok(ExtractedDocument {
            title: markdown_title(&content),
            source: url.to_string(),
            content,
            source_type: SourceType::Web,
            metadata: BTreeMap::new(),
        })
    }

    /// Jina returns all hits in one document, so `max_results` is not sent.
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<ExtractedDocument>, ExtractError> {
        let builder = self.request(&self.search_url).query(&[("q", query)]);
        let source = format!("{}?q={query}", self.search_url);
        let content = self.fetch_text(builder, &source).await?;

        Ok(vec![ExtractedDocument {
            title: format!("Search results for: {query}"),
            source,
            content,
            source_type: SourceType::Search,
            metadata: BTreeMap::new(),
        }])
    }
}
