//! # OpenTwin Agent
//!
//! Session-level behaviour built on the core traits:
//!
//! - [`ConversationLog`]: the in-process, append-only history of one session
//! - [`ConversationMemory`]: joins the log with an optional long-term store and
//!   renders the per-request context window
//! - [`TranscriptStore`]: all-or-nothing transcript files
//! - [`persona`]: persona analysis and in-character response generation
//! - [`tutor`]: the English tutor session, prompt library and scenarios

pub mod context;
pub mod conversation;
pub mod persona;
pub mod transcript;
pub mod tutor;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{ContextWindow, ConversationMemory, DropInfo};
pub use conversation::ConversationLog;
pub use transcript::TranscriptStore;
