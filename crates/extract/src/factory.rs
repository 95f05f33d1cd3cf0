//! Extractor factory and the catalogue shown by `opentwin info`.

use std::sync::Arc;

use opentwin_config::ExtractorConfig;
use opentwin_core::{ContentExtractor, ExtractError};

use crate::firecrawl::FirecrawlExtractor;
use crate::jina::JinaExtractor;

/// Build the extractor named `kind`, or the configured one when `None`.
pub fn create_extractor(
    kind: Option<&str>,
    config: &ExtractorConfig,
) -> Result<Arc<dyn ContentExtractor>, ExtractError> {
    let kind = kind.unwrap_or(config.kind.as_str()).to_lowercase();
    match kind.as_str() {
        "jina" => Ok(Arc::new(JinaExtractor::new(config.jina_api_key.clone()))),
        "firecrawl" => Ok(Arc::new(FirecrawlExtractor::new(
            config.firecrawl_api_key.clone(),
            config.tavily_api_key.clone(),
        )?)),
        other => Err(ExtractError::UnknownExtractor(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub cost: &'static str,
    pub features: &'static [&'static str],
    pub api_key_required: bool,
    pub recommended_for: &'static str,
}

pub fn extractor_catalog() -> Vec<ExtractorInfo> {
    vec![
        ExtractorInfo {
            id: "jina",
            name: "Jina AI Reader",
            cost: "FREE (20 req/min without key, 200 req/min with free key)",
            features: &["Clean text extraction", "PDF support", "Image captions"],
            api_key_required: false,
            recommended_for: "Simple use cases, no API key needed",
        },
        ExtractorInfo {
            id: "firecrawl",
            name: "Firecrawl + Tavily",
            cost: "FREE tier available (limited usage)",
            features: &[
                "JavaScript rendering",
                "96% web coverage",
                "Intelligent search",
                "High-quality extraction",
            ],
            api_key_required: true,
            recommended_for: "Best performance, complex sites",
        },
    ]
}
