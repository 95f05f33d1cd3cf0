//! English conversation tutor.
//!
//! [`TutorSession`] is the explicit per-invocation session object: it owns
//! the conversation memory, prompt library, scenario catalog and the active
//! scenario. Nothing is kept in process-wide state.

pub mod error;
pub mod prompts;
pub mod scenario;

pub use error::TutorError;
pub use prompts::{ErrorMessage, PromptLibrary};
pub use scenario::{Scenario, ScenarioCatalog, ScenarioStatistics};

use std::path::PathBuf;
use std::sync::Arc;

use opentwin_config::{AppConfig, MemoryConfig, TeacherConfig};
use opentwin_core::{
    ChatMessage, Error, LlmClient, LlmRequest, PersistenceError, Result, Role, SessionId,
};
use rand::seq::IndexedRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::{ConversationMemory, token};
use crate::transcript::TranscriptStore;

const SESSION_TITLE: &str = "English Teaching Session";
const NO_CONVERSATION: &str = "No conversation yet.";
const SUMMARY_FAILED: &str = "Summary generation failed.";
const SUMMARY_TEMPERATURE: f32 = 0.3;
const SUMMARY_MAX_TOKENS: u32 = 150;

/// Word counts and settings for the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub total_exchanges: usize,
    pub student_words: usize,
    pub teacher_words: usize,
    pub memory_enabled: bool,
    pub model: String,
}

/// Where the student is in the active scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioProgress {
    pub scenario: String,
    pub exchanges_completed: usize,
    pub estimated_duration_minutes: u32,
    pub vocabulary_focus: Vec<String>,
    pub ai_character: String,
}

/// Wrap-up of a finished scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub exchanges: usize,
    pub vocabulary_practiced: Vec<String>,
    pub learning_objectives: Vec<String>,
    pub conversation_summary: String,
}

pub struct TutorSession {
    id: SessionId,
    llm: Arc<dyn LlmClient>,
    memory: ConversationMemory,
    prompts: PromptLibrary,
    scenarios: ScenarioCatalog,
    transcripts: TranscriptStore,
    config: TeacherConfig,
    scenario: Option<Scenario>,
    system_prompt: String,
}

impl TutorSession {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        config: TeacherConfig,
        prompts: PromptLibrary,
        scenarios: ScenarioCatalog,
        memory: ConversationMemory,
    ) -> std::result::Result<Self, TutorError> {
        let system_prompt = prompts.system_prompt()?.to_string();
        let transcripts = TranscriptStore::new(&config.conversation_dir);
        let id = SessionId::new();
        info!(
            session = %id,
            model = llm.model(),
            memory = memory.memory_enabled(),
            "Tutor session started"
        );
        Ok(Self {
            id,
            llm,
            memory,
            prompts,
            scenarios,
            transcripts,
            config,
            scenario: None,
            system_prompt,
        })
    }

    /// Build a session from application configuration.
    ///
    /// `use_memory` can only switch memory off; it never enables memory the
    /// configuration disables.
    pub fn from_config(
        llm: Arc<dyn LlmClient>,
        app: &AppConfig,
        use_memory: bool,
    ) -> std::result::Result<Self, TutorError> {
        let teacher = app.teacher.clone();
        let prompts = PromptLibrary::load(teacher.prompts_file.as_deref())?;
        let scenarios = ScenarioCatalog::load(teacher.scenarios_file.as_deref())?;

        let memory_config = MemoryConfig {
            enabled: app.memory.enabled && teacher.use_memory && use_memory,
            ..app.memory.clone()
        };
        let memory = ConversationMemory::from_config("English Tutor", &memory_config, &teacher.memory_dir);

        Self::new(llm, teacher, prompts, scenarios, memory)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    pub fn scenarios(&self) -> &ScenarioCatalog {
        &self.scenarios
    }

    pub fn current_scenario(&self) -> Option<&Scenario> {
        self.scenario.as_ref()
    }

    pub fn in_scenario(&self) -> bool {
        self.scenario.is_some()
    }

    /// Reply to the student.
    ///
    /// The system prompt carries any relevant memories; the recent
    /// `max_history_exchanges` exchanges go in as chat messages.
    pub async fn chat(&mut self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("message cannot be empty".into()));
        }

        let memories = self
            .memory
            .build_context(message, 0, self.config.memory_retrieval_top_k)
            .await;

        self.memory.store_turn(Role::User, message, None).await?;

        let history: Vec<ChatMessage> = self
            .memory
            .log()
            .recent(self.config.max_history_exchanges * 2)
            .iter()
            .map(ChatMessage::from)
            .collect();

        let system = if memories.is_empty() {
            self.system_prompt.clone()
        } else {
            format!("{}\n\n{memories}", self.system_prompt)
        };

        debug!(
            history = history.len(),
            estimated_tokens = token::estimate_tokens(&system) + token::estimate_messages_tokens(&history),
            "Tutor request"
        );

        let request = LlmRequest::new(history)
            .with_system(system)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        let reply = self.llm.complete(request).await?.content;

        self.memory
            .store_turn(Role::Assistant, &reply, Some(message))
            .await?;
        Ok(reply)
    }

    /// First greeting for a fresh session, a varied one afterwards.
    pub fn greeting(&self) -> String {
        let greetings = self.prompts.greetings();
        let first = greetings.first().cloned().unwrap_or_default();
        if self.memory.log().is_empty() {
            return first;
        }
        greetings
            .get(1..)
            .and_then(|rest| rest.choose(&mut rand::rng()))
            .cloned()
            .unwrap_or(first)
    }

    /// Start over in the current mode. Long-term memory is kept.
    pub fn reset(&mut self) {
        self.memory.clear_conversation();
    }

    /// Short LLM summary of what the student said. Never fails.
    pub async fn summary(&self) -> String {
        let student: Vec<&str> = self
            .memory
            .log()
            .iter()
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .collect();
        if student.is_empty() {
            return NO_CONVERSATION.to_string();
        }

        let prompt = match self.prompts.summary_prompt(&student.join("\n")) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "No summary prompt available");
                return SUMMARY_FAILED.to_string();
            }
        };

        let request = LlmRequest::prompt(prompt)
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_tokens(SUMMARY_MAX_TOKENS);
        match self.llm.complete(request).await {
            Ok(r) => r.content.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Summary generation failed");
                SUMMARY_FAILED.to_string()
            }
        }
    }

    /// Write the transcript with a fresh summary.
    pub async fn save(&self) -> std::result::Result<PathBuf, PersistenceError> {
        if self.memory.log().is_empty() {
            return Err(PersistenceError::EmptySession);
        }
        let summary = self.summary().await;
        let title = match &self.scenario {
            Some(s) => format!("{SESSION_TITLE}: {}", s.title),
            None => SESSION_TITLE.to_string(),
        };
        self.transcripts
            .save(&self.id, self.memory.log(), &title, &summary)
    }

    /// Graceful end of session: saves when `auto_save` is on and there is
    /// something to save.
    pub async fn finish(&self) -> std::result::Result<Option<PathBuf>, PersistenceError> {
        if !self.config.auto_save || self.memory.log().is_empty() {
            return Ok(None);
        }
        self.save().await.map(Some)
    }

    pub fn stats(&self) -> SessionStats {
        let words = |role: Role| -> usize {
            self.memory
                .log()
                .iter()
                .filter(|t| t.role == role)
                .map(|t| t.word_count())
                .sum()
        };
        SessionStats {
            total_exchanges: self
                .memory
                .log()
                .iter()
                .filter(|t| t.role == Role::User)
                .count(),
            student_words: words(Role::User),
            teacher_words: words(Role::Assistant),
            memory_enabled: self.memory.memory_enabled(),
            model: self.llm.model().to_string(),
        }
    }

    /// Enter a scenario: clears the conversation and switches the system
    /// prompt. Returns the introduction to show the student.
    pub fn start_scenario(&mut self, scenario_id: &str) -> std::result::Result<String, TutorError> {
        let scenario = self
            .scenarios
            .get(scenario_id)
            .cloned()
            .ok_or_else(|| TutorError::UnknownScenario(scenario_id.to_string()))?;

        self.reset();
        self.system_prompt = scenario.system_prompt();
        let intro = scenario.intro_message();
        info!(scenario = %scenario.scenario_id, title = %scenario.title, "Scenario started");
        self.scenario = Some(scenario);
        Ok(intro)
    }

    /// Leave the active scenario and return to free conversation.
    pub async fn end_scenario(&mut self) -> Option<ScenarioSummary> {
        let scenario = self.scenario.as_ref()?;
        let summary = ScenarioSummary {
            scenario: scenario.title.clone(),
            exchanges: self.memory.log().len() / 2,
            vocabulary_practiced: scenario.vocabulary_focus.clone(),
            learning_objectives: scenario.learning_objectives.clone(),
            conversation_summary: self.summary().await,
        };

        self.scenario = None;
        if let Ok(prompt) = self.prompts.system_prompt() {
            self.system_prompt = prompt.to_string();
        }
        info!(scenario = %summary.scenario, exchanges = summary.exchanges, "Scenario ended");
        Some(summary)
    }

    pub fn scenario_progress(&self) -> Option<ScenarioProgress> {
        let scenario = self.scenario.as_ref()?;
        Some(ScenarioProgress {
            scenario: scenario.title.clone(),
            exchanges_completed: self.memory.log().len() / 2,
            estimated_duration_minutes: scenario.duration_minutes,
            vocabulary_focus: scenario.vocabulary_focus.clone(),
            ai_character: scenario.ai_role.name.clone(),
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingStore, ScriptedClient};
    use opentwin_core::ProviderError;
    use opentwin_memory::InMemoryStore;

    fn teacher_config(dir: &std::path::Path) -> TeacherConfig {
        TeacherConfig {
            conversation_dir: dir.join("conversations"),
            memory_dir: dir.join("memory"),
            max_history_exchanges: 1,
            ..TeacherConfig::default()
        }
    }

    fn session(
        llm: Arc<ScriptedClient>,
        dir: &std::path::Path,
        memory: ConversationMemory,
    ) -> TutorSession {
        TutorSession::new(
            llm,
            teacher_config(dir),
            PromptLibrary::builtin().unwrap(),
            ScenarioCatalog::builtin().unwrap(),
            memory,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn chat_rejects_blank_message() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&[]));
        let mut tutor = session(llm.clone(), dir.path(), ConversationMemory::new("t"));

        let err = tutor.chat("   ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(llm.call_count(), 0);
        assert!(tutor.memory().log().is_empty());
    }

    #[tokio::test]
    async fn chat_sends_recent_history() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&["Nice to meet you!", "Sounds fun."]));
        let mut tutor = session(llm.clone(), dir.path(), ConversationMemory::new("t"));

        assert_eq!(tutor.chat("Hello, I'm Li.").await.unwrap(), "Nice to meet you!");
        assert_eq!(tutor.chat("I like hiking.").await.unwrap(), "Sounds fun.");

        let requests = llm.requests();
        // max_history_exchanges = 1: the previous reply plus the new message
        let second = &requests[1];
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[0].role, Role::Assistant);
        assert_eq!(second.messages[1].content, "I like hiking.");
        assert_eq!(second.system.as_deref(), Some(tutor.system_prompt()));
        assert_eq!(second.max_tokens, Some(300));
        assert_eq!(tutor.memory().log().len(), 4);
    }

    #[tokio::test]
    async fn chat_adds_memories_to_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(ScriptedClient::replies(&["Tell me more about hiking!"]));
        let mut memory = ConversationMemory::with_store("t", store);
        memory
            .add_content(
                "Student enjoys hiking on weekends",
                "conversation",
                "conversation",
                Default::default(),
            )
            .await
            .unwrap();
        let mut tutor = session(llm.clone(), dir.path(), memory);

        tutor.chat("I went hiking again").await.unwrap();
        let system = llm.requests()[0].system.clone().unwrap();
        assert!(system.contains("## Relevant Context from Memory"));
        assert!(system.contains("Student enjoys hiking on weekends"));
        assert!(!system.contains("## Recent Conversation"));
    }

    #[tokio::test]
    async fn chat_survives_store_failure() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&["Hi!"]));
        let memory = ConversationMemory::with_store("t", Arc::new(FailingStore));
        let mut tutor = session(llm, dir.path(), memory);

        assert_eq!(tutor.chat("Hello").await.unwrap(), "Hi!");
        assert_eq!(tutor.memory().failed_writes(), 1);
    }

    #[tokio::test]
    async fn provider_error_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::new(vec![Err(ProviderError::Timeout("slow".into()))]));
        let mut tutor = session(llm, dir.path(), ConversationMemory::new("t"));

        let err = tutor.chat("Hello").await.unwrap_err();
        assert!(err.is_delegate_unavailable());
    }

    #[tokio::test]
    async fn greeting_first_then_varied() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&["Hi!"]));
        let mut tutor = session(llm, dir.path(), ConversationMemory::new("t"));
        let greetings = tutor.prompts().greetings();

        assert_eq!(tutor.greeting(), greetings[0]);
        tutor.chat("Hello").await.unwrap();
        let later = tutor.greeting();
        assert!(greetings[1..].contains(&later));
    }

    #[tokio::test]
    async fn summary_without_student_turns() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&[]));
        let tutor = session(llm.clone(), dir.path(), ConversationMemory::new("t"));
        assert_eq!(tutor.summary().await, NO_CONVERSATION);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn summary_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::new(vec![
            Ok("Hi!".into()),
            Err(ProviderError::Network("down".into())),
        ]));
        let mut tutor = session(llm, dir.path(), ConversationMemory::new("t"));
        tutor.chat("Hello").await.unwrap();
        assert_eq!(tutor.summary().await, SUMMARY_FAILED);
    }

    #[tokio::test]
    async fn save_writes_transcript_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&["Hi!", "You greeted the tutor."]));
        let mut tutor = session(llm.clone(), dir.path(), ConversationMemory::new("t"));
        tutor.chat("Hello").await.unwrap();

        let path = tutor.save().await.unwrap();
        assert!(path.starts_with(dir.path().join("conversations")));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(SESSION_TITLE));
        assert!(text.contains("user: Hello"));
        assert!(text.contains("assistant: Hi!"));
        assert!(text.contains("Session Summary:\nYou greeted the tutor."));

        let summary_request = &llm.requests()[1];
        assert_eq!(summary_request.temperature, Some(0.3));
        assert_eq!(summary_request.max_tokens, Some(150));
    }

    #[tokio::test]
    async fn save_empty_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tutor = session(Arc::new(ScriptedClient::replies(&[])), dir.path(), ConversationMemory::new("t"));
        assert!(matches!(tutor.save().await, Err(PersistenceError::EmptySession)));
        assert!(matches!(tutor.finish().await, Ok(None)));
    }

    #[tokio::test]
    async fn finish_honours_auto_save() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&["Hi!", "summary", "Hi again!"]));
        let mut tutor = session(llm, dir.path(), ConversationMemory::new("t"));
        tutor.chat("Hello").await.unwrap();
        assert!(tutor.finish().await.unwrap().is_some());

        tutor.config.auto_save = false;
        tutor.chat("Hello again").await.unwrap();
        assert!(tutor.finish().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_count_words() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&["Nice to meet you!"]));
        let mut tutor = session(llm, dir.path(), ConversationMemory::new("t"));
        tutor.chat("Hello there tutor").await.unwrap();

        let stats = tutor.stats();
        assert_eq!(stats.total_exchanges, 1);
        assert_eq!(stats.student_words, 3);
        assert_eq!(stats.teacher_words, 4);
        assert!(!stats.memory_enabled);
        assert_eq!(stats.model, "mock-model");
    }

    #[tokio::test]
    async fn scenario_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(ScriptedClient::replies(&[
            "Hi! Anything else?", "What can I get you?", "Ordered a latte.",
        ]));
        let mut tutor = session(llm.clone(), dir.path(), ConversationMemory::new("t"));
        tutor.chat("warm-up").await.unwrap();
        let default_prompt = tutor.system_prompt().to_string();

        let intro = tutor.start_scenario("coffee_shop_order").unwrap();
        assert!(intro.contains("Ordering at a Coffee Shop"));
        assert!(tutor.in_scenario());
        assert!(tutor.memory().log().is_empty());
        assert!(tutor.system_prompt().contains("**Your Role:** Alex"));

        tutor.chat("Hi, can I get an oat milk latte?").await.unwrap();
        let progress = tutor.scenario_progress().unwrap();
        assert_eq!(progress.exchanges_completed, 1);
        assert_eq!(progress.ai_character, "Alex");
        assert_eq!(progress.estimated_duration_minutes, 5);

        let summary = tutor.end_scenario().await.unwrap();
        assert_eq!(summary.scenario, "Ordering at a Coffee Shop");
        assert_eq!(summary.exchanges, 1);
        assert_eq!(summary.conversation_summary, "Ordered a latte.");
        assert!(!tutor.in_scenario());
        assert_eq!(tutor.system_prompt(), default_prompt);
        assert!(tutor.scenario_progress().is_none());
        assert!(tutor.end_scenario().await.is_none());
    }

    #[tokio::test]
    async fn unknown_scenario_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut tutor = session(Arc::new(ScriptedClient::replies(&[])), dir.path(), ConversationMemory::new("t"));
        let err = tutor.start_scenario("nope").unwrap_err();
        assert!(matches!(err, TutorError::UnknownScenario(id) if id == "nope"));
        assert!(!tutor.in_scenario());
    }

    #[test]
    fn from_config_no_memory_flag_disables_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = AppConfig::default();
        app.teacher = teacher_config(dir.path());
        let llm = Arc::new(ScriptedClient::replies(&[]));

        let tutor = TutorSession::from_config(llm.clone(), &app, false).unwrap();
        assert!(!tutor.memory().memory_enabled());

        let tutor = TutorSession::from_config(llm, &app, true).unwrap();
        assert!(tutor.memory().memory_enabled());
    }
}
