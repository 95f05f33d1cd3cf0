//! Configuration loading, validation, and management for OpenTwin.
//!
//! Settings are resolved once at process start, lowest priority first:
//! built-in defaults, `config/opentwin.toml`, `config/.env`, then the
//! process environment. Validation runs after all layers are applied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "anthropic", "openrouter", "ollama", "groq"];

/// Extractors the factory knows how to build.
pub const KNOWN_EXTRACTORS: &[&str] = &["jina", "firecrawl"];

/// Voices offered by the speech endpoint.
pub const KNOWN_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// The root configuration structure.
///
/// Maps directly to `config/opentwin.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub teacher: TeacherConfig,

    #[serde(default)]
    pub voice: VoiceConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `openai`, `anthropic`, or an OpenAI-compatible name
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Overrides the provider's default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,

    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_openai_model() -> String {
    "gpt-4o".into()
}
fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            base_url: None,
            anthropic_api_key: None,
            anthropic_model: default_anthropic_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// The key for the selected provider. Anthropic has its own key; every
    /// other provider speaks the OpenAI wire format and uses the OpenAI key.
    pub fn api_key(&self) -> Option<&str> {
        match self.provider.as_str() {
            "anthropic" => self.anthropic_api_key.as_deref(),
            "ollama" => Some(""),
            _ => self.openai_api_key.as_deref(),
        }
    }

    /// The model for the selected provider.
    pub fn model(&self) -> &str {
        match self.provider.as_str() {
            "anthropic" => &self.anthropic_model,
            _ => &self.openai_model,
        }
    }

    fn key_var(&self) -> &'static str {
        match self.provider.as_str() {
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_model", &self.openai_model)
            .field("base_url", &self.base_url)
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("anthropic_model", &self.anthropic_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    #[serde(rename = "type", default = "default_extractor")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jina_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firecrawl_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily_api_key: Option<String>,

    /// Pause between consecutive URL extractions
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

fn default_extractor() -> String {
    "jina".into()
}
fn default_request_delay_ms() -> u64 {
    3000
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            kind: default_extractor(),
            jina_api_key: None,
            firecrawl_api_key: None,
            tavily_api_key: None,
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl std::fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("kind", &self.kind)
            .field("jina_api_key", &redact(&self.jina_api_key))
            .field("firecrawl_api_key", &redact(&self.firecrawl_api_key))
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("request_delay_ms", &self.request_delay_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Defaults to `<data_dir>/database.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), database: None }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir.join("database.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `file` (JSONL, survives restarts) or `memory` (ephemeral)
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Defaults to `<data_dir>/<persona-slug>/memory`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_max_memories")]
    pub max_memories: usize,

    /// Token ceiling for the assembled context; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<usize>,
}

fn default_memory_backend() -> String {
    "file".into()
}
fn default_max_turns() -> usize {
    5
}
fn default_max_memories() -> usize {
    3
}
fn default_true() -> bool {
    true
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: default_memory_backend(),
            dir: None,
            max_turns: default_max_turns(),
            max_memories: default_max_memories(),
            token_budget: None,
        }
    }
}

/// Settings for the English tutor persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherConfig {
    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_teacher_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_true")]
    pub use_memory: bool,

    #[serde(default = "default_teacher_memory_dir")]
    pub memory_dir: PathBuf,

    #[serde(default = "default_conversation_dir")]
    pub conversation_dir: PathBuf,

    /// Exchanges (user + assistant pairs) replayed to the model
    #[serde(default = "default_max_history_exchanges")]
    pub max_history_exchanges: usize,

    #[serde(default = "default_memory_retrieval_top_k")]
    pub memory_retrieval_top_k: usize,

    #[serde(default = "default_true")]
    pub auto_save: bool,

    /// Overrides the built-in prompt library
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_file: Option<PathBuf>,

    /// Overrides the built-in scenario catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios_file: Option<PathBuf>,
}

fn default_teacher_max_tokens() -> u32 {
    300
}
fn default_teacher_memory_dir() -> PathBuf {
    PathBuf::from("data/teacher_memory")
}
fn default_conversation_dir() -> PathBuf {
    PathBuf::from("data/conversations")
}
fn default_max_history_exchanges() -> usize {
    10
}
fn default_memory_retrieval_top_k() -> usize {
    3
}

impl Default for TeacherConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            temperature: default_temperature(),
            max_tokens: default_teacher_max_tokens(),
            use_memory: true,
            memory_dir: default_teacher_memory_dir(),
            conversation_dir: default_conversation_dir(),
            max_history_exchanges: default_max_history_exchanges(),
            memory_retrieval_top_k: default_memory_retrieval_top_k(),
            auto_save: true,
            prompts_file: None,
            scenarios_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    #[serde(default = "default_stt_language")]
    pub stt_language: String,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_tts_voice")]
    pub tts_voice: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channels")]
    pub channels: u16,

    #[serde(default = "default_record_seconds")]
    pub record_seconds: u32,

    /// Recorder program; `arecord` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_command: Option<String>,
}

fn default_stt_model() -> String {
    "whisper-1".into()
}
fn default_stt_language() -> String {
    "en".into()
}
fn default_tts_model() -> String {
    "tts-1".into()
}
fn default_tts_voice() -> String {
    "nova".into()
}
fn default_sample_rate() -> u32 {
    16000
}
fn default_channels() -> u16 {
    1
}
fn default_record_seconds() -> u32 {
    5
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_model: default_stt_model(),
            stt_language: default_stt_language(),
            tts_model: default_tts_model(),
            tts_voice: default_tts_voice(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            record_seconds: default_record_seconds(),
            record_command: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location (`./config`, or
    /// `OPENTWIN_CONFIG_DIR`), then apply `.env` and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = Self::config_dir();
        Self::load_dotenv(&config_dir);

        let mut config = Self::read_file(&config_dir.join("opentwin.toml"))?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path (no environment overrides).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// `config/.env` first, then a `.env` in the working directory.
    /// Variables already set in the process are never overwritten.
    fn load_dotenv(config_dir: &Path) {
        let env_file = config_dir.join(".env");
        match dotenvy::from_path(&env_file) {
            Ok(()) => tracing::debug!("Loaded environment from {}", env_file.display()),
            Err(_) => {
                if dotenvy::dotenv().is_ok() {
                    tracing::debug!("Loaded environment from ./.env");
                }
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        std::env::var("OPENTWIN_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // LLM
        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v.to_lowercase();
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.llm.openai_model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_MODEL") {
            self.llm.anthropic_model = v;
        }

        // Extraction
        if let Some(v) = get("EXTRACTOR_TYPE") {
            self.extractor.kind = v.to_lowercase();
        }
        if let Some(v) = get("JINA_API_KEY") {
            self.extractor.jina_api_key = Some(v);
        }
        if let Some(v) = get("FIRECRAWL_API_KEY") {
            self.extractor.firecrawl_api_key = Some(v);
        }
        if let Some(v) = get("TAVILY_API_KEY") {
            self.extractor.tavily_api_key = Some(v);
        }

        // Storage and memory
        if let Some(v) = get("OPENTWIN_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("OPENTWIN_MEMORY_DIR") {
            self.memory.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("OPENTWIN_MEMORY_BACKEND") {
            self.memory.backend = v.to_lowercase();
        }
        if let Some(v) = get("OPENTWIN_TOKEN_BUDGET") {
            self.memory.token_budget = Some(parse_var("OPENTWIN_TOKEN_BUDGET", &v)?);
        }

        // Tutor
        if let Some(v) = get("TEACHER_MODEL") {
            self.teacher.model = v;
        }
        if let Some(v) = get("TEACHER_TEMPERATURE") {
            self.teacher.temperature = parse_var("TEACHER_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("TEACHER_MAX_TOKENS") {
            self.teacher.max_tokens = parse_var("TEACHER_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("TEACHER_USE_MEMORY") {
            self.teacher.use_memory = v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = get("TEACHER_MEMORY_DIR") {
            self.teacher.memory_dir = PathBuf::from(v);
        }
        if let Some(v) = get("TEACHER_CONVERSATION_DIR") {
            self.teacher.conversation_dir = PathBuf::from(v);
        }

        // Voice
        if let Some(v) = get("STT_MODEL") {
            self.voice.stt_model = v;
        }
        if let Some(v) = get("STT_LANGUAGE") {
            self.voice.stt_language = v;
        }
        if let Some(v) = get("TTS_MODEL") {
            self.voice.tts_model = v;
        }
        if let Some(v) = get("TTS_VOICE") {
            self.voice.tts_voice = v.to_lowercase();
        }
        if let Some(v) = get("AUDIO_SAMPLE_RATE") {
            self.voice.sample_rate = parse_var("AUDIO_SAMPLE_RATE", &v)?;
        }
        if let Some(v) = get("AUDIO_CHANNELS") {
            self.voice.channels = parse_var("AUDIO_CHANNELS", &v)?;
        }
        if let Some(v) = get("AUDIO_RECORD_SECONDS") {
            self.voice.record_seconds = parse_var("AUDIO_RECORD_SECONDS", &v)?;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, t) in [
            ("llm.temperature", self.llm.temperature),
            ("teacher.temperature", self.teacher.temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown LLM_PROVIDER '{}' (expected one of: {})",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EXTRACTORS.contains(&self.extractor.kind.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown EXTRACTOR_TYPE '{}' (expected one of: {})",
                self.extractor.kind,
                KNOWN_EXTRACTORS.join(", ")
            )));
        }

        if !matches!(self.memory.backend.as_str(), "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}' (expected file or memory)",
                self.memory.backend
            )));
        }

        if !KNOWN_VOICES.contains(&self.voice.tts_voice.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown TTS_VOICE '{}' (expected one of: {})",
                self.voice.tts_voice,
                KNOWN_VOICES.join(", ")
            )));
        }

        if self.voice.channels == 0 || self.voice.sample_rate == 0 {
            return Err(ConfigError::ValidationError(
                "audio sample rate and channel count must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available for the selected LLM provider.
    pub fn has_api_key(&self) -> bool {
        self.llm.api_key().is_some()
    }

    /// The selected provider's key, or a fatal configuration error.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.llm
            .api_key()
            .ok_or_else(|| ConfigError::MissingApiKey(self.llm.key_var().to_string()))
    }

    /// The OpenAI key, required by the speech endpoints regardless of the
    /// selected chat provider.
    pub fn require_openai_key(&self) -> Result<&str, ConfigError> {
        self.llm
            .openai_api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("OPENAI_API_KEY".into()))
    }

    /// Memory directory for a persona: explicit setting, or
    /// `<data_dir>/<slug>/memory`.
    pub fn memory_dir_for(&self, persona: &str) -> PathBuf {
        match &self.memory.dir {
            Some(dir) => dir.clone(),
            None => self.storage.data_dir.join(slugify(persona)).join("memory"),
        }
    }

    /// A flat key/value view for the `status` and `info` commands.
    /// Secrets appear only as set/unset.
    pub fn summary(&self) -> HashMap<&'static str, String> {
        let set = |k: &Option<String>| if k.is_some() { "set" } else { "not set" }.to_string();
        HashMap::from([
            ("llm_provider", self.llm.provider.clone()),
            ("llm_model", self.llm.model().to_string()),
            ("openai_api_key", set(&self.llm.openai_api_key)),
            ("anthropic_api_key", set(&self.llm.anthropic_api_key)),
            ("extractor", self.extractor.kind.clone()),
            ("data_dir", self.storage.data_dir.display().to_string()),
            ("memory_backend", self.memory.backend.clone()),
            ("tts_voice", self.voice.tts_voice.clone()),
        ])
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Lowercase, spaces to underscores: "Jerome Powell" -> "jerome_powell".
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} has an invalid value '{value}'"))
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("{0} is not set. Add it to config/.env or export it in your shell.")]
    MissingApiKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.openai_model, "gpt-4o");
        assert_eq!(config.teacher.max_tokens, 300);
        assert_eq!(config.teacher.max_history_exchanges, 10);
        assert_eq!(config.voice.tts_voice, "nova");
        assert_eq!(config.voice.sample_rate, 16000);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.provider, config.llm.provider);
        assert_eq!(parsed.teacher.conversation_dir, config.teacher.conversation_dir);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.teacher.temperature = 5.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("teacher.temperature"));
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("LLM_PROVIDER", "Gemini")])).unwrap();
        assert_eq!(config.llm.provider, "gemini");
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/opentwin.toml")).unwrap();
        assert_eq!(config.extractor.kind, "jina");
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opentwin.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"anthropic\"\n\n[extractor]\ntype = \"firecrawl\"\n\n[memory]\nmax_turns = 8\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.model(), "claude-3-5-sonnet-20241022");
        assert_eq!(config.extractor.kind, "firecrawl");
        assert_eq!(config.memory.max_turns, 8);
        assert_eq!(config.memory.max_memories, 3);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opentwin.toml");
        std::fs::write(&path, "[llm\nprovider = ").unwrap();
        assert!(matches!(AppConfig::load_from(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("OPENAI_MODEL", "gpt-4o-mini"),
                ("TEACHER_USE_MEMORY", "False"),
                ("TEACHER_MAX_TOKENS", "500"),
                ("TTS_VOICE", "Alloy"),
                ("AUDIO_SAMPLE_RATE", "24000"),
            ]))
            .unwrap();

        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.llm.model(), "gpt-4o-mini");
        assert!(!config.teacher.use_memory);
        assert_eq!(config.teacher.max_tokens, 500);
        assert_eq!(config.voice.tts_voice, "alloy");
        assert_eq!(config.voice.sample_rate, 24000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn token_budget_env_override() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENTWIN_TOKEN_BUDGET", "3000")])).unwrap();
        assert_eq!(config.memory.token_budget, Some(3000));

        let err = AppConfig::default()
            .apply_env(env(&[("OPENTWIN_TOKEN_BUDGET", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(m) if m.contains("OPENTWIN_TOKEN_BUDGET")));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(!config.has_api_key());
    }

    #[test]
    fn unparsable_number_is_rejected() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("AUDIO_CHANNELS", "stereo")])).unwrap_err();
        assert!(err.to_string().contains("AUDIO_CHANNELS"));
    }

    #[test]
    fn missing_key_names_the_variable() {
        let mut config = AppConfig::default();
        config.llm.provider = "anthropic".into();
        config.llm.openai_api_key = Some("sk-openai".into());
        let err = config.require_api_key().unwrap_err();
        assert!(matches!(&err, ConfigError::MissingApiKey(var) if var == "ANTHROPIC_API_KEY"));
        assert_eq!(config.require_openai_key().unwrap(), "sk-openai");
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.llm.openai_api_key = Some("sk-secret-value".into());
        config.extractor.jina_api_key = Some("jina-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(!debug.contains("jina-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn memory_dir_defaults_to_persona_slug() {
        let config = AppConfig::default();
        assert_eq!(
            config.memory_dir_for("Jerome Powell"),
            PathBuf::from("data/jerome_powell/memory")
        );
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("whisper-1"));
    }
}
