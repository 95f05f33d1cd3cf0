//! Content extractors for OpenTwin.
//!
//! Every extractor implements `opentwin_core::ContentExtractor`; the factory
//! picks one from `EXTRACTOR_TYPE`. Local files go through
//! [`DocumentParser`] instead.

pub mod document;
pub mod factory;
pub mod firecrawl;
pub mod jina;
pub mod sources;

pub use document::DocumentParser;
pub use factory::{ExtractorInfo, create_extractor, extractor_catalog};
pub use firecrawl::FirecrawlExtractor;
pub use jina::JinaExtractor;
pub use sources::POWELL_SPEECHES;

use std::time::Duration;

use opentwin_core::{ContentExtractor, ExtractedDocument};
use tracing::{info, warn};

/// Extract `urls` one at a time, pausing `delay` between requests.
/// Failures are logged and skipped, so the result may be shorter than `urls`.
pub async fn extract_many(
    extractor: &dyn ContentExtractor,
    urls: &[&str],
    delay: Duration,
) -> Vec<ExtractedDocument> {
    let mut documents = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        info!(extractor = extractor.name(), "Extracting {}/{}: {url}", i + 1, urls.len());
        match extractor.extract_url(url).await {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!(url, error = %e, "Extraction failed, skipping"),
        }
        if i + 1 < urls.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    documents
}

/// First `# ` heading of a markdown document, or empty.
pub(crate) fn markdown_title(content: &str) -> String {
    content
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use opentwin_core::{ExtractError, SourceType};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentExtractor for FlakyExtractor {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn extract_url(&self, url: &str) -> Result<ExtractedDocument, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("bad") {
                return Err(ExtractError::RequestFailed { url: url.into(), reason: "500".into() });
            }
            Ok(ExtractedDocument {
                title: String::new(),
                source: url.into(),
                content: "text".into(),
                source_type: SourceType::Web,
                metadata: BTreeMap::new(),
            })
        }

        async fn search(&self, _: &str, _: usize) -> Result<Vec<ExtractedDocument>, ExtractError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn extract_many_skips_failures() {
        let extractor = FlakyExtractor { calls: AtomicUsize::new(0) };
        let docs = extract_many(&extractor, &["https://a", "https://bad", "https://c"], Duration::ZERO).await;
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].source, "https://c");
    }

    #[test]
    fn title_from_first_heading() {
        assert_eq!(markdown_title("intro\n# Opening Remarks \n## Sub"), "Opening Remarks");
        assert_eq!(markdown_title("no heading"), "");
    }
}
