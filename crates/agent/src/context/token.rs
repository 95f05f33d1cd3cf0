//! Token estimation utilities.
//!
//! Character heuristic: 1 token ≈ 4 characters, rounded up. Counts
//! characters rather than bytes so non-ASCII text is not over-estimated.

use opentwin_core::{ChatMessage, ConversationTurn};

/// Per-message overhead for role name and delimiters in the wire format.
const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Tokens for a single chat message including overhead.
pub fn estimate_message_tokens(message: &ChatMessage) -> usize {
    MESSAGE_OVERHEAD + estimate_tokens(&message.content)
}

/// Tokens for a slice of chat messages.
pub fn estimate_messages_tokens(messages: &[ChatMessage]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

/// Tokens a turn costs once rendered as `role: content`.
pub fn estimate_turn_tokens(turn: &ConversationTurn) -> usize {
    estimate_tokens(turn.role.as_str()) + 1 + estimate_tokens(&turn.content)
}
