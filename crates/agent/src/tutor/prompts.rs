//! Tutor prompt templates loaded from YAML.

use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::error::TutorError;

const BUILTIN_PROMPTS: &str = include_str!("../../data/prompts.yaml");

const FALLBACK_GREETING: &str = "Hello! What would you like to talk about today?";

/// A user-facing error message with a hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(default)]
    pub suggestion: String,
}

impl Default for ErrorMessage {
    fn default() -> Self {
        Self {
            message: "An error occurred. Please try again.".into(),
            suggestion: String::new(),
        }
    }
}

/// Nested prompt document with typed accessors.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    path: Option<PathBuf>,
    prompts: Value,
}

impl PromptLibrary {
    /// The prompts shipped with the binary.
    pub fn builtin() -> Result<Self, TutorError> {
        Self::from_yaml_str(BUILTIN_PROMPTS)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TutorError> {
        Ok(Self {
            path: None,
            prompts: parse(yaml)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, TutorError> {
        Ok(Self {
            path: Some(path.to_path_buf()),
            prompts: parse(&read(path)?)?,
        })
    }

    /// `path` when given, the built-in prompts otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, TutorError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    /// Re-read the backing file. Built-in prompts are left as they are.
    pub fn reload(&mut self) -> Result<(), TutorError> {
        if let Some(path) = &self.path {
            self.prompts = parse(&read(path)?)?;
        }
        Ok(())
    }

    /// Value at a nested key path, e.g. `["system_prompt", "content"]`.
    pub fn get(&self, keys: &[&str]) -> Result<&Value, TutorError> {
        let mut node = &self.prompts;
        for key in keys {
            node = node
                .get(*key)
                .ok_or_else(|| TutorError::MissingKey(keys.join(".")))?;
        }
        Ok(node)
    }

    fn text(&self, keys: &[&str]) -> Result<&str, TutorError> {
        self.get(keys)?
            .as_str()
            .ok_or_else(|| TutorError::NotText(keys.join(".")))
    }

    pub fn system_prompt(&self) -> Result<&str, TutorError> {
        self.text(&["system_prompt", "content"])
    }

    /// First-session greeting followed by the returning-session greetings.
    pub fn greetings(&self) -> Vec<String> {
        let mut greetings = Vec::new();
        if let Ok(first) = self.text(&["greetings", "first_session", "message"]) {
            greetings.push(first.to_string());
        }
        if let Ok(Value::Sequence(items)) = self.get(&["greetings", "returning_session"]) {
            greetings.extend(
                items
                    .iter()
                    .filter_map(|item| item.get("message").and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
        if greetings.is_empty() {
            greetings.push(FALLBACK_GREETING.to_string());
        }
        greetings
    }

    pub fn summary_prompt(&self, conversation_text: &str) -> Result<String, TutorError> {
        let template = self.text(&["summary_prompt", "template"])?;
        Ok(fill(template, &[("conversation_text", conversation_text)]))
    }

    /// The message for `kind`, or a generic one when `kind` is unknown.
    pub fn error_message(&self, kind: &str) -> ErrorMessage {
        self.get(&["error_messages", kind])
            .ok()
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn encouragement(&self) -> Option<String> {
        let Ok(Value::Sequence(items)) = self.get(&["feedback_prompts", "encouragement"]) else {
            return None;
        };
        let choices: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
        choices.choose(&mut rand::rng()).map(|s| s.to_string())
    }

    pub fn gentle_correction(
        &self,
        student_phrase: &str,
        corrected_phrase: &str,
    ) -> Result<String, TutorError> {
        let template = self.text(&["feedback_prompts", "gentle_correction", "template"])?;
        Ok(fill(
            template,
            &[
                ("student_phrase", student_phrase),
                ("corrected_phrase", corrected_phrase),
            ],
        ))
    }

    pub fn grammar_explanation(
        &self,
        rule: &str,
        correct_example: &str,
        incorrect_example: &str,
        tip: &str,
    ) -> Result<String, TutorError> {
        let template = self.text(&["feedback_prompts", "grammar_explanation", "template"])?;
        Ok(fill(
            template,
            &[
                ("rule", rule),
                ("correct_example", correct_example),
                ("incorrect_example", incorrect_example),
                ("tip", tip),
            ],
        ))
    }

    pub fn metadata(&self) -> Result<&Value, TutorError> {
        self.get(&["metadata"])
    }

    pub fn all(&self) -> &Value {
        &self.prompts
    }
}

fn read(path: &Path) -> Result<String, TutorError> {
    std::fs::read_to_string(path).map_err(|source| TutorError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(yaml: &str) -> Result<Value, TutorError> {
    serde_yaml::from_str(yaml).map_err(|source| TutorError::Parse {
        what: "prompts",
        source,
    })
}

/// Substitute `{name}` placeholders.
pub(crate) fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), value)
        })
}
