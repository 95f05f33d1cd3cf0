//! Role-play scenarios for tutor sessions.

use std::collections::BTreeMap;
use std::path::Path;

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use super::error::TutorError;

const BUILTIN_SCENARIOS: &str = include_str!("../../data/scenarios.yaml");

/// Scenario sections in catalog order.
pub const CATEGORIES: [&str; 5] = ["academic", "campus_life", "social", "professional", "everyday"];
pub const DIFFICULTIES: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRole {
    pub name: String,
    pub personality: String,
    pub speaking_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPrompts {
    #[serde(default = "default_initial")]
    pub initial: String,
    #[serde(default)]
    pub follow_up: Vec<String>,
}

fn default_initial() -> String {
    "Hello!".into()
}

/// One scripted role-play situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    /// Set from the section the scenario is listed under.
    #[serde(default)]
    pub category: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub duration_minutes: u32,
    pub context: String,
    pub ai_role: AiRole,
    pub learning_objectives: Vec<String>,
    pub vocabulary_focus: Vec<String>,
    pub conversation_starters: Vec<String>,
    pub ai_prompts: AiPrompts,
}

impl Scenario {
    /// System prompt that puts the model in character.
    pub fn system_prompt(&self) -> String {
        let role = &self.ai_role;
        let follow_ups = self
            .ai_prompts
            .follow_up
            .iter()
            .map(|f| format!("\"{f}\""))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You are participating in a scenario-based English learning conversation.\n\
             \n\
             **Scenario:** {title}\n\
             **Your Role:** {name}\n\
             **Personality:** {personality}\n\
             **Speaking Style:** {style}\n\
             \n\
             **Context:**\n\
             {context}\n\
             \n\
             **Your Objectives:**\n\
             - Stay in character as {name}\n\
             - Speak naturally as this character would\n\
             - Ask relevant follow-up questions\n\
             - Provide realistic responses\n\
             - Help the student practice natural conversation\n\
             - Gently correct major errors by modeling correct usage\n\
             - Keep the conversation flowing naturally\n\
             \n\
             **Important:**\n\
             - Respond as {name} would, not as a teacher\n\
             - Don't break character or mention that you're an AI\n\
             - Use appropriate vocabulary and tone for this role\n\
             - Keep responses conversational (2-4 sentences usually)\n\
             - React naturally to what the student says\n\
             \n\
             **Conversation Flow:**\n\
             - Start with: \"{initial}\"\n\
             - Follow up naturally based on student responses\n\
             - Use these follow-ups when relevant: [{follow_ups}]\n",
            title = self.title,
            name = role.name,
            personality = role.personality,
            style = role.speaking_style,
            context = self.context.trim_end(),
            initial = self.ai_prompts.initial,
        )
    }

    /// Introduction shown to the student when the scenario starts.
    pub fn intro_message(&self) -> String {
        let bullets = |items: &[String]| {
            items
                .iter()
                .map(|s| format!("  - {s}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "📚 Scenario: {title}\n\
             🎯 Difficulty: {difficulty} | ⏱️ Duration: ~{minutes} minutes\n\
             \n\
             Situation:\n\
             {context}\n\
             \n\
             You will interact with: {name}\n\
             {personality}\n\
             \n\
             Learning Objectives:\n\
             {objectives}\n\
             \n\
             You can start with:\n\
             {starters}\n\
             \n\
             ---\n\
             Ready? Start the conversation whenever you're ready!",
            title = self.title,
            difficulty = self.difficulty,
            minutes = self.duration_minutes,
            context = self.context.trim_end(),
            name = self.ai_role.name,
            personality = self.ai_role.personality,
            objectives = bullets(&self.learning_objectives),
            starters = bullets(&self.conversation_starters),
        )
    }

    fn matches_keyword(&self, keyword: &str) -> bool {
        [&self.title, &self.description, &self.context]
            .iter()
            .any(|field| field.to_lowercase().contains(keyword))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProgressionLevel {
    #[serde(default)]
    recommended_scenarios: Vec<String>,
}

/// Aggregate counts over the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioStatistics {
    pub total_scenarios: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_difficulty: BTreeMap<String, usize>,
    pub total_learning_objectives: usize,
    pub avg_duration_minutes: f64,
}

/// All scenarios plus progression and cultural notes.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
    progression: BTreeMap<String, ProgressionLevel>,
    cultural_notes: BTreeMap<String, Vec<String>>,
    metadata: Value,
}

impl ScenarioCatalog {
    pub fn builtin() -> Result<Self, TutorError> {
        Self::from_yaml_str(BUILTIN_SCENARIOS)
    }

    pub fn from_file(path: &Path) -> Result<Self, TutorError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| TutorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// `path` when given, the built-in catalog otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, TutorError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TutorError> {
        let invalid = |source| TutorError::Parse {
            what: "scenarios",
            source,
        };
        let doc: Value = serde_yaml::from_str(yaml).map_err(invalid)?;

        let mut scenarios = Vec::new();
        for category in CATEGORIES {
            let Some(Value::Mapping(entries)) = doc.get(category) else {
                continue;
            };
            for entry in entries.values() {
                let mut scenario: Scenario =
                    serde_yaml::from_value(entry.clone()).map_err(invalid)?;
                scenario.category = category.to_string();
                scenarios.push(scenario);
            }
        }

        let section = |key: &str| doc.get(key).cloned().unwrap_or(Value::Null);
        let progression = match section("progression") {
            Value::Null => BTreeMap::new(),
            v => serde_yaml::from_value(v).map_err(invalid)?,
        };
        let cultural_notes = match section("cultural_notes") {
            Value::Null => BTreeMap::new(),
            v => serde_yaml::from_value(v).map_err(invalid)?,
        };

        debug!(scenarios = scenarios.len(), "Scenario catalog loaded");
        Ok(Self {
            scenarios,
            progression,
            cultural_notes,
            metadata: section("metadata"),
        })
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn get(&self, scenario_id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.scenario_id == scenario_id)
    }

    /// Scenarios matching both filters; `None` matches everything.
    pub fn list(&self, category: Option<&str>, difficulty: Option<&str>) -> Vec<&Scenario> {
        self.scenarios
            .iter()
            .filter(|s| category.is_none_or(|c| s.category == c))
            .filter(|s| difficulty.is_none_or(|d| s.difficulty == d))
            .collect()
    }

    /// A random match for the filters, or a random scenario from the whole
    /// catalog when nothing matches. `None` only when the catalog is empty.
    pub fn random(&self, category: Option<&str>, difficulty: Option<&str>) -> Option<&Scenario> {
        let mut rng = rand::rng();
        let matching = self.list(category, difficulty);
        if let Some(s) = matching.choose(&mut rng) {
            return Some(*s);
        }
        self.scenarios.choose(&mut rng)
    }

    /// Scenarios recommended for a progress level such as `first_week`.
    pub fn recommended(&self, level: &str) -> Vec<&Scenario> {
        self.progression
            .get(level)
            .map(|p| {
                p.recommended_scenarios
                    .iter()
                    .filter_map(|id| self.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Case-insensitive match on title, description or context.
    pub fn search(&self, keyword: &str) -> Vec<&Scenario> {
        let keyword = keyword.to_lowercase();
        self.scenarios
            .iter()
            .filter(|s| s.matches_keyword(&keyword))
            .collect()
    }

    /// Distinct categories present, in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        CATEGORIES
            .into_iter()
            .filter(|c| self.scenarios.iter().any(|s| s.category == *c))
            .collect()
    }

    pub fn cultural_notes(&self, topic: Option<&str>) -> BTreeMap<String, Vec<String>> {
        match topic {
            Some(t) => BTreeMap::from([(
                t.to_string(),
                self.cultural_notes.get(t).cloned().unwrap_or_default(),
            )]),
            None => self.cultural_notes.clone(),
        }
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn statistics(&self) -> ScenarioStatistics {
        let by_category = self
            .categories()
            .into_iter()
            .map(|c| (c.to_string(), self.list(Some(c), None).len()))
            .collect();
        let by_difficulty = DIFFICULTIES
            .into_iter()
            .map(|d| (d.to_string(), self.list(None, Some(d)).len()))
            .collect();
        let total_duration: u32 = self.scenarios.iter().map(|s| s.duration_minutes).sum();
        let avg_duration_minutes = if self.scenarios.is_empty() {
            0.0
        } else {
            f64::from(total_duration) / self.scenarios.len() as f64
        };

        ScenarioStatistics {
            total_scenarios: self.scenarios.len(),
            by_category,
            by_difficulty,
            total_learning_objectives: self
                .scenarios
                .iter()
                .map(|s| s.learning_objectives.len())
                .sum(),
            avg_duration_minutes,
        }
    }
}
