//! The in-process conversation log.

use opentwin_core::{ConversationTurn, Error, Result};

/// Append-only, ordered history of the current session.
///
/// Turns are never mutated after they are appended; callers only ever get
/// shared references. Nothing here touches the disk.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Blank content is rejected.
    pub fn append(&mut self, turn: ConversationTurn) -> Result<()> {
        if turn.content.trim().is_empty() {
            return Err(Error::InvalidTurn(format!(
                "{} turn has empty content",
                turn.role
            )));
        }
        self.turns.push(turn);
        Ok(())
    }

    /// The last `min(n, len)` turns in chronological order.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a ConversationTurn;
    type IntoIter = std::slice::Iter<'a, ConversationTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
