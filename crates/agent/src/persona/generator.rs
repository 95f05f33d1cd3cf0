//! In-character responses grounded in the persona's own material.

use std::sync::Arc;

use opentwin_core::{ContentItem, LlmClient, LlmRequest, ProviderError};
use tracing::debug;

use super::truncate_chars;

/// References shown to the model per request.
pub const MAX_REFERENCES: usize = 3;
/// Characters kept from each reference.
pub const REFERENCE_PREVIEW_CHARS: usize = 1000;

const RESPONSE_TEMPERATURE: f32 = 0.7;
const RESPONSE_MAX_TOKENS: u32 = 2000;
const FOMC_MAX_TOKENS: u32 = 3000;

pub struct ResponseGenerator {
    llm: Arc<dyn LlmClient>,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Items sharing the most query words, best first, at most `max`.
    ///
    /// Score is the number of distinct query words found in the item;
    /// items scoring zero are left out.
    pub fn find_relevant_context<'a>(
        items: &'a [ContentItem],
        query: &str,
        max: usize,
    ) -> Vec<&'a ContentItem> {
        let lowered = query.to_lowercase();
        let mut keywords: Vec<&str> = lowered.split_whitespace().collect();
        keywords.sort_unstable();
        keywords.dedup();

        let mut scored: Vec<(usize, &ContentItem)> = items
            .iter()
            .filter_map(|item| {
                let content = item.content.to_lowercase();
                let score = keywords.iter().filter(|kw| content.contains(*kw)).count();
                (score > 0).then_some((score, item))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(max).map(|(_, item)| item).collect()
    }

    /// Respond to `query` as the persona.
    ///
    /// `references` are placed before the query; `conversation_context`
    /// (recent turns and memories) is appended to the system prompt.
    pub async fn generate_response(
        &self,
        query: &str,
        system_prompt: &str,
        references: &[&ContentItem],
        conversation_context: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.generate(query, system_prompt, references, conversation_context, RESPONSE_MAX_TOKENS)
            .await
    }

    async fn generate(
        &self,
        query: &str,
        system_prompt: &str,
        references: &[&ContentItem],
        conversation_context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let system = match conversation_context.filter(|c| !c.trim().is_empty()) {
            Some(context) => format!("{system_prompt}\n\n{context}"),
            None => system_prompt.to_string(),
        };

        debug!(
            references = references.len().min(MAX_REFERENCES),
            with_context = conversation_context.is_some(),
            "Generating persona response"
        );

        let request = LlmRequest::prompt(build_user_message(query, references))
            .with_system(system)
            .with_temperature(RESPONSE_TEMPERATURE)
            .with_max_tokens(max_tokens);
        let response = self.llm.complete(request).await?;
        Ok(response.content)
    }

    /// An FOMC-style policy decision for the given indicators.
    pub async fn generate_fomc_decision(
        &self,
        economic_data: &[(String, String)],
        system_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.generate(&fomc_query(economic_data), system_prompt, &[], None, FOMC_MAX_TOKENS)
            .await
    }
}

fn reference_title(item: &ContentItem) -> &str {
    item.metadata
        .get("title")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or("Untitled")
}

fn build_user_message(query: &str, references: &[&ContentItem]) -> String {
    if references.is_empty() {
        return query.to_string();
    }

    let parts: Vec<String> = references
        .iter()
        .take(MAX_REFERENCES)
        .enumerate()
        .map(|(i, item)| {
            format!(
                "**Reference {}: {}**\n{}",
                i + 1,
                reference_title(item),
                truncate_chars(&item.content, REFERENCE_PREVIEW_CHARS)
            )
        })
        .collect();

    format!(
        "Use the following references from past communications to inform your response:\n\n\
         {}\n\n---\n\nNow, respond to the following:\n\n{query}",
        parts.join("\n\n")
    )
}

/// Indicators used by `fomc` when none are given.
pub fn default_economic_data(
    inflation: &str,
    unemployment: &str,
    gdp_growth: &str,
) -> Vec<(String, String)> {
    vec![
        ("Inflation (CPI)".into(), inflation.into()),
        ("Unemployment Rate".into(), unemployment.into()),
        ("GDP Growth".into(), gdp_growth.into()),
        ("Federal Funds Rate (current)".into(), "5.25-5.50%".into()),
    ]
}

fn fomc_query(economic_data: &[(String, String)]) -> String {
    let data: Vec<String> = economic_data
        .iter()
        .map(|(key, value)| format!("- {key}: {value}"))
        .collect();

    format!(
        "Based on the following economic data, provide:\n\
         \n\
         1. **Policy Decision**: Should the Federal Reserve raise, lower, or maintain the \
         federal funds rate? By how much?\n\
         \n\
         2. **Rationale**: Explain the reasoning behind this decision, considering:\n   \
         - Inflation trends\n   \
         - Employment situation\n   \
         - Economic growth\n   \
         - Financial stability\n   \
         - Long-term goals\n\
         \n\
         3. **Forward Guidance**: What signals should be communicated about future policy?\n\
         \n\
         **Current Economic Data:**\n\
         {}\n\
         \n\
         Provide your response in the style of an FOMC statement.",
        data.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedClient;
    use chrono::Utc;

    fn item(id: i64, title: &str, content: &str) -> ContentItem {
        ContentItem {
            id,
            source: format!("https://example.com/{id}"),
            source_type: "web".into(),
            content: content.into(),
            metadata: serde_json::json!({ "title": title }),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn relevant_context_ranks_by_keyword_hits() {
        let items = vec![
            item(1, "Labor", "The labor market remains tight."),
            item(2, "Inflation", "Inflation and the labor market both matter."),
            item(3, "Other", "Nothing to see."),
        ];
        let hits = ResponseGenerator::find_relevant_context(&items, "inflation labor", 3);
        let ids: Vec<i64> = hits.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn relevant_context_respects_max() {
        let items: Vec<ContentItem> = (0..5).map(|i| item(i, "t", "rates")).collect();
        assert_eq!(ResponseGenerator::find_relevant_context(&items, "rates", 3).len(), 3);
        assert!(ResponseGenerator::find_relevant_context(&items, "rates", 0).is_empty());
    }

    #[test]
    fn user_message_without_references_is_query() {
        assert_eq!(build_user_message("What now?", &[]), "What now?");
    }

    #[test]
    fn user_message_caps_references() {
        let long = "y".repeat(2000);
        let items: Vec<ContentItem> = (0..5).map(|i| item(i, "Speech", &long)).collect();
        let refs: Vec<&ContentItem> = items.iter().collect();

        let message = build_user_message("What now?", &refs);
        assert!(message.contains("**Reference 3: Speech**"));
        assert!(!message.contains("**Reference 4"));
        let preview = "y".repeat(REFERENCE_PREVIEW_CHARS);
        assert!(message.contains(&format!("{preview}\n")));
        assert!(!message.contains(&"y".repeat(REFERENCE_PREVIEW_CHARS + 1)));
        assert!(message.ends_with("Now, respond to the following:\n\nWhat now?"));
    }

    #[test]
    fn untitled_reference() {
        let mut it = item(1, "", "text");
        it.metadata = serde_json::json!({});
        assert_eq!(reference_title(&it), "Untitled");
    }

    #[tokio::test]
    async fn generate_response_sends_system_and_context() {
        let llm = Arc::new(ScriptedClient::replies(&["Rates stay put."]));
        let generator = ResponseGenerator::new(llm.clone());
        let speech = item(1, "Jackson Hole", "We will keep at it.");

        let reply = generator
            .generate_response(
                "Will you cut?",
                "You are a digital twin.",
                &[&speech],
                Some("## Recent Conversation\nuser: Hi"),
            )
            .await
            .unwrap();
        assert_eq!(reply, "Rates stay put.");

        let request = &llm.requests()[0];
        assert_eq!(
            request.system.as_deref(),
            Some("You are a digital twin.\n\n## Recent Conversation\nuser: Hi")
        );
        assert_eq!(request.max_tokens, Some(2000));
        assert!(request.messages[0].content.contains("**Reference 1: Jackson Hole**"));
    }

    #[tokio::test]
    async fn fomc_decision_lists_indicators() {
        let llm = Arc::new(ScriptedClient::replies(&["The Committee decided..."]));
        let generator = ResponseGenerator::new(llm.clone());
        let data = default_economic_data("3.2%", "3.7%", "2.5%");

        let statement = generator
            .generate_fomc_decision(&data, "You are a digital twin.")
            .await
            .unwrap();
        assert_eq!(statement, "The Committee decided...");

        let request = &llm.requests()[0];
        let body = &request.messages[0].content;
        assert!(body.contains("- Inflation (CPI): 3.2%"));
        assert!(body.contains("- Federal Funds Rate (current): 5.25-5.50%"));
        assert!(body.ends_with("in the style of an FOMC statement."));
        assert_eq!(request.max_tokens, Some(3000));
        assert_eq!(request.system.as_deref(), Some("You are a digital twin."));
    }
}
