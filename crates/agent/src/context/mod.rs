//! Context assembly: the per-request window of recent turns and retrieved
//! memories.

pub mod assembler;
pub mod token;

pub use assembler::{ContextWindow, ConversationMemory, DropInfo};
