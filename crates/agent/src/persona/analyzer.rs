//! Persona analysis: four LLM passes over a person's collected writing.

use std::sync::Arc;

use opentwin_core::{ContentItem, LlmClient, LlmRequest, PersonaProfile, ProviderError};
use tracing::info;

use super::truncate_chars;

/// Cap on the combined text handed to analysis.
pub const MAX_COMBINED_CHARS: usize = 50_000;
/// Cap on the text each individual analysis sees.
pub const MAX_ANALYSIS_CHARS: usize = 15_000;

const SEPARATOR: &str = "\n\n---\n\n";
const ANALYSIS_TEMPERATURE: f32 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 2000;

const WRITING_STYLE_PROMPT: &str = "Analyze the writing style of the following text. Focus on:
1. Tone (formal, conversational, technical, etc.)
2. Sentence structure (short/long, simple/complex)
3. Vocabulary level and word choice
4. Common phrases or expressions
5. Use of data, evidence, or examples

Provide a concise summary (3-5 sentences) of the writing style.";

const COMMUNICATION_PROMPT: &str = "Analyze the communication patterns in the following text. Focus on:
1. How ideas are structured and presented
2. Use of analogies, metaphors, or examples
3. Level of directness vs. diplomatic language
4. Emphasis on certain topics or themes
5. How uncertainty or confidence is expressed

Provide a concise summary (3-5 sentences) of the communication patterns.";

const TOPICS_PROMPT: &str = "Identify and analyze the key topics and themes in the following text. Focus on:
1. Main topics frequently discussed
2. Recurring themes or concerns
3. Areas of expertise or focus
4. How different topics are connected

Provide a concise summary (3-5 sentences) of the main topics and themes.";

const DECISION_PROMPT: &str = "Analyze the decision-making approach in the following text. Focus on:
1. How decisions are framed and justified
2. Use of data vs. judgment
3. Consideration of risks and uncertainties
4. Balance between different factors or stakeholders
5. Communication of decisions and rationale

Provide a concise summary (3-5 sentences) of the decision-making style.";

/// Builds a [`PersonaProfile`] from content items.
pub struct PersonaAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl PersonaAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Run the four analyses over `items` and collect the profile.
    pub async fn analyze_content(
        &self,
        items: &[ContentItem],
    ) -> Result<PersonaProfile, ProviderError> {
        let combined = prepare_content(items, MAX_COMBINED_CHARS);
        info!(
            items = items.len(),
            chars = combined.chars().count(),
            model = self.llm.model(),
            "Analyzing persona content"
        );

        info!("Analyzing writing style");
        let writing_style = self.analyze(&combined, WRITING_STYLE_PROMPT).await?;
        info!("Analyzing communication patterns");
        let communication_patterns = self.analyze(&combined, COMMUNICATION_PROMPT).await?;
        info!("Analyzing key topics and themes");
        let topics_themes = self.analyze(&combined, TOPICS_PROMPT).await?;
        info!("Analyzing decision-making approach");
        let decision_style = self.analyze(&combined, DECISION_PROMPT).await?;

        Ok(PersonaProfile {
            writing_style,
            communication_patterns,
            topics_themes,
            decision_style,
            content_count: items.len(),
        })
    }

    async fn analyze(&self, text: &str, prompt: &str) -> Result<String, ProviderError> {
        let excerpt = truncate_chars(text, MAX_ANALYSIS_CHARS);
        let request = LlmRequest::prompt(format!("{prompt}{SEPARATOR}Text to analyze:\n{excerpt}"))
            .with_temperature(ANALYSIS_TEMPERATURE)
            .with_max_tokens(ANALYSIS_MAX_TOKENS);
        let response = self.llm.complete(request).await?;
        Ok(response.content.trim().to_string())
    }

    /// The digital-twin system prompt for `name`.
    pub fn system_prompt(profile: &PersonaProfile, name: &str) -> String {
        let mut prompt = format!(
            "You are a digital twin of {name}. Your goal is to respond and make decisions \
             in the same style and manner as {name}.\n"
        );
        let sections = [
            ("Writing Style", &profile.writing_style),
            ("Communication Patterns", &profile.communication_patterns),
            ("Key Topics and Themes", &profile.topics_themes),
            ("Decision-Making Approach", &profile.decision_style),
        ];
        for (label, text) in sections {
            let text = if text.trim().is_empty() {
                "Not available"
            } else {
                text.as_str()
            };
            prompt.push_str(&format!("\n**{label}:**\n{text}\n"));
        }
        prompt.push_str(&format!(
            "\nWhen responding:\n\
             - Maintain {name}'s tone, style, and communication patterns\n\
             - Use similar language, phrases, and vocabulary\n\
             - Consider topics and themes in the same way {name} would\n\
             - Apply the same decision-making approach\n\
             - Be authentic to {name}'s perspective and reasoning\n\
             \n\
             Base your responses on the patterns observed in {name}'s actual \
             communications and writings."
        ));
        prompt
    }
}

/// Join non-empty item contents with the separator, stopping once the total
/// passes `max_chars`, and cap the result at `max_chars`.
pub fn prepare_content(items: &[ContentItem], max_chars: usize) -> String {
    let mut texts = Vec::new();
    let mut total = 0;
    for item in items {
        if item.content.is_empty() {
            continue;
        }
        texts.push(item.content.as_str());
        total += item.content.chars().count();
        if total > max_chars {
            break;
        }
    }
    truncate_chars(&texts.join(SEPARATOR), max_chars).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedClient;
    use chrono::Utc;

    fn item(content: &str) -> ContentItem {
        ContentItem {
            id: 1,
            source: "https://example.com".into(),
            source_type: "web".into(),
            content: content.into(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn prepare_joins_with_separator() {
        let items = [item("one"), item(""), item("two")];
        assert_eq!(prepare_content(&items, 100), "one\n\n---\n\ntwo");
    }

    #[test]
    fn prepare_caps_length() {
        let items = [item(&"a".repeat(40)), item(&"b".repeat(40)), item("never")];
        let combined = prepare_content(&items, 50);
        assert_eq!(combined.chars().count(), 50);
        assert!(!combined.contains("never"));
    }

    #[tokio::test]
    async fn analyze_runs_four_passes() {
        let llm = Arc::new(ScriptedClient::replies(&[
            "Formal.", "Measured.", "Inflation.", "Data-driven.",
        ]));
        let analyzer = PersonaAnalyzer::new(llm.clone());

        let profile = analyzer
            .analyze_content(&[item("Price stability is our goal.")])
            .await
            .unwrap();

        assert_eq!(profile.writing_style, "Formal.");
        assert_eq!(profile.communication_patterns, "Measured.");
        assert_eq!(profile.topics_themes, "Inflation.");
        assert_eq!(profile.decision_style, "Data-driven.");
        assert_eq!(profile.content_count, 1);

        let requests = llm.requests();
        assert_eq!(requests.len(), 4);
        for request in &requests {
            assert_eq!(request.temperature, Some(0.3));
            assert!(request.messages[0].content.contains("Text to analyze:\nPrice stability"));
        }
        assert!(requests[0].messages[0].content.starts_with("Analyze the writing style"));
        assert!(requests[3].messages[0].content.starts_with("Analyze the decision-making"));
    }

    #[tokio::test]
    async fn each_pass_sees_at_most_analysis_cap() {
        let llm = Arc::new(ScriptedClient::replies(&["a", "b", "c", "d"]));
        let analyzer = PersonaAnalyzer::new(llm.clone());
        analyzer
            .analyze_content(&[item(&"x".repeat(30_000))])
            .await
            .unwrap();

        for request in llm.requests() {
            let body = &request.messages[0].content;
            let excerpt = body.split("Text to analyze:\n").nth(1).unwrap();
            assert_eq!(excerpt.chars().count(), MAX_ANALYSIS_CHARS);
        }
    }

    #[tokio::test]
    async fn provider_failure_propagates() {
        let llm = Arc::new(ScriptedClient::new(vec![
            Ok("fine".into()),
            Err(ProviderError::RateLimited { retry_after_secs: 5 }),
        ]));
        let analyzer = PersonaAnalyzer::new(llm);
        let err = analyzer.analyze_content(&[item("text")]).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[test]
    fn system_prompt_includes_profile() {
        let profile = PersonaProfile {
            writing_style: "Formal.".into(),
            communication_patterns: String::new(),
            topics_themes: "Inflation.".into(),
            decision_style: "Data-driven.".into(),
            content_count: 3,
        };
        let prompt = PersonaAnalyzer::system_prompt(&profile, "Jerome Powell");
        assert!(prompt.starts_with("You are a digital twin of Jerome Powell."));
        assert!(prompt.contains("**Writing Style:**\nFormal."));
        assert!(prompt.contains("**Communication Patterns:**\nNot available"));
        assert!(prompt.contains("**Key Topics and Themes:**\nInflation."));
        assert!(prompt.contains("**Decision-Making Approach:**\nData-driven."));
        assert!(prompt.contains("Maintain Jerome Powell's tone"));
    }
}
