//! # OpenTwin Core
//!
//! Domain types, traits, and error definitions shared by every OpenTwin crate.
//! Backends (LLM clients, long-term stores, extractors, speech services) are
//! defined here as traits; implementations live in their own crates and are
//! selected by configuration.

pub mod error;
pub mod turn;
pub mod memory;
pub mod llm;
pub mod extractor;
pub mod speech;
pub mod persona;

// Re-export key types at crate root for ergonomics
pub use error::{
    Error, ExtractError, MemoryError, PersistenceError, ProviderError, Result, SpeechError,
};
pub use turn::{ConversationTurn, Role, SessionId};
pub use memory::{LongTermStore, MemoryRecord, MemoryStats};
pub use llm::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Usage};
pub use extractor::{ContentExtractor, ExtractedDocument, SourceType};
pub use speech::{SpeechToText, TextToSpeech};
pub use persona::{ContentItem, PersonaProfile};
