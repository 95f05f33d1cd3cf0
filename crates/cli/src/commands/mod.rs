//! CLI subcommand implementations, plus the helpers they share.

pub mod analyze;
pub mod chat;
pub mod extract;
pub mod fomc;
pub mod info;
pub mod query;
pub mod scenario;
pub mod status;
mod tutor_loop;
pub mod voice_chat;

use std::error::Error as StdError;
use std::io::Write;
use std::sync::Arc;

use opentwin_agent::persona::analyzer::PersonaAnalyzer;
use opentwin_agent::tutor::TutorError;
use opentwin_config::{AppConfig, ConfigError};
use opentwin_core::{Error, ExtractError, LlmClient, ProviderError};
use opentwin_memory::ContentStore;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub type CommandResult = Result<(), Box<dyn StdError>>;

/// Line reader over stdin shared by the interactive loops.
pub type InputLines = Lines<BufReader<Stdin>>;

pub fn stdin_lines() -> InputLines {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Print `prompt` and wait for the next line. `None` at end of input.
pub async fn prompt_line(lines: &mut InputLines, prompt: &str) -> std::io::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

pub fn is_exit_word(input: &str) -> bool {
    matches!(
        input.to_lowercase().as_str(),
        "exit" | "quit" | "/exit" | "/quit" | ":q"
    )
}

pub async fn open_content_store(config: &AppConfig) -> Result<ContentStore, Box<dyn StdError>> {
    let path = config.storage.database_path();
    Ok(ContentStore::open(&path.to_string_lossy()).await?)
}

/// The digital-twin system prompt for an analysed persona.
pub async fn persona_system_prompt(
    store: &ContentStore,
    name: &str,
) -> Result<String, Box<dyn StdError>> {
    match store.persona_profile(name).await? {
        Some(profile) => Ok(PersonaAnalyzer::system_prompt(&profile, name)),
        None => Err(format!(
            "No persona profile for {name}. Run `opentwin analyze --name \"{name}\"` first."
        )
        .into()),
    }
}

/// The LLM client for the tutor. OpenAI-compatible providers run the
/// tutor's own model; Anthropic keeps its configured one.
pub fn tutor_llm(config: &AppConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let mut tutor = config.clone();
    if tutor.llm.provider != "anthropic" {
        tutor.llm.openai_model = config.teacher.model.clone();
    }
    opentwin_providers::build_from_config(&tutor)
}

/// Process exit code for a failed command: 2 when the failure comes from
/// configuration, 1 otherwise.
pub fn exit_code(err: &(dyn StdError + 'static)) -> u8 {
    if is_config_error(err) { 2 } else { 1 }
}

fn is_config_error(err: &(dyn StdError + 'static)) -> bool {
    if err.is::<ConfigError>() {
        return true;
    }
    if let Some(e) = err.downcast_ref::<TutorError>() {
        return !matches!(e, TutorError::UnknownScenario(_));
    }
    if let Some(e) = err.downcast_ref::<ExtractError>() {
        return matches!(
            e,
            ExtractError::NotConfigured(_) | ExtractError::UnknownExtractor(_)
        );
    }
    if let Some(e) = err.downcast_ref::<ProviderError>() {
        return matches!(e, ProviderError::NotConfigured(_));
    }
    if let Some(e) = err.downcast_ref::<Error>() {
        return matches!(
            e,
            Error::Config { .. } | Error::Provider(ProviderError::NotConfigured(_))
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words() {
        for word in ["exit", "quit", "/exit", "/quit", ":q", "EXIT"] {
            assert!(is_exit_word(word), "{word}");
        }
        assert!(!is_exit_word("exits"));
        assert!(!is_exit_word(""));
    }

    #[test]
    fn config_failures_exit_with_two() {
        let missing: Box<dyn StdError> = Box::new(ConfigError::MissingApiKey("OPENAI_API_KEY".into()));
        assert_eq!(exit_code(missing.as_ref()), 2);

        let extractor: Box<dyn StdError> = Box::new(ExtractError::UnknownExtractor("pdf".into()));
        assert_eq!(exit_code(extractor.as_ref()), 2);

        let core: Box<dyn StdError> = Box::new(Error::Config {
            message: "bad".into(),
        });
        assert_eq!(exit_code(core.as_ref()), 2);
    }

    #[test]
    fn runtime_failures_exit_with_one() {
        let scenario: Box<dyn StdError> = Box::new(TutorError::UnknownScenario("nope".into()));
        assert_eq!(exit_code(scenario.as_ref()), 1);

        let provider: Box<dyn StdError> = Box::new(ProviderError::Timeout("30s".into()));
        assert_eq!(exit_code(provider.as_ref()), 1);

        let plain: Box<dyn StdError> = "No persona profile".into();
        assert_eq!(exit_code(plain.as_ref()), 1);
    }
}
