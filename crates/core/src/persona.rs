//! Persona profile and the stored content it is derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A piece of extracted content kept for persona analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub source: String,
    pub source_type: String,
    pub content: String,

    /// Raw JSON object, as stored
    #[serde(default)]
    pub metadata: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

/// The structured result of persona analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    pub writing_style: String,
    pub communication_patterns: String,
    pub topics_themes: String,
    pub decision_style: String,

    /// How many content items went into the analysis
    #[serde(default)]
    pub content_count: usize,
}

impl PersonaProfile {
    /// The four analysed aspects with their display labels.
    pub fn aspects(&self) -> [(&'static str, &str); 4] {
        [
            ("Writing Style", &self.writing_style),
            ("Communication Patterns", &self.communication_patterns),
            ("Topics & Themes", &self.topics_themes),
            ("Decision Style", &self.decision_style),
        ]
    }
}
