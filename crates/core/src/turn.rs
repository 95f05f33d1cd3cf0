//! Conversation turn and session identifier types.
//!
//! A user message comes in, the assistant answers, and both become
//! [`ConversationTurn`]s appended to the session's conversation log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(Error::InvalidTurn(format!("unrecognized role '{other}'"))),
        }
    }
}

/// A single exchange entry. Never mutated after it enters a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,

    /// The user message that produced this turn (assistant turns only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            query: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Parse the role from free text, as it arrives from a caller.
    pub fn parse(role: &str, content: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::new(role.parse()?, content))
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Word count, used by session statistics.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_values() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!(" Assistant ".parse::<Role>().unwrap(), Role::Assistant);
    }

    #[test]
    fn role_rejects_unknown_values() {
        let err = "system".parse::<Role>().unwrap_err();
        assert!(matches!(err, Error::InvalidTurn(_)));
        assert!(err.to_string().contains("system"));
    }

    #[test]
    fn turn_builders() {
        let turn = ConversationTurn::assistant("Hello!").with_query("Hi");
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.query.as_deref(), Some("Hi"));
        assert_eq!(turn.word_count(), 1);
    }

    #[test]
    fn turn_serializes_lowercase_role() {
        let json = serde_json::to_string(&ConversationTurn::user("Hi")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("query"));
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_eq!(SessionId::from("abc").to_string(), "abc");
    }
}
