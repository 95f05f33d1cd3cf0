//! Conversation memory and context assembly.
//!
//! [`ConversationMemory`] joins the session's [`ConversationLog`] with an
//! optional long-term store and produces the context window handed to the
//! language model on every request. The window has two layers:
//!
//! 1. **Recent Conversation**: the last `max_turns` turns, chronological
//! 2. **Relevant Context from Memory**: up to `max_memories` records from the
//!    long-term store, most relevant first
//!
//! Building a context never fails. When the store is absent, switched off,
//! or returns an error, the window degrades to the recent turns alone.
//!
//! # Token budget
//!
//! With a budget set, memories are dropped first (least relevant first) and
//! only then the oldest turns, until the rendered window fits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use opentwin_config::MemoryConfig;
use opentwin_core::{
    ConversationTurn, LongTermStore, MemoryError, MemoryRecord, MemoryStats, Result, Role,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::token;
use crate::conversation::ConversationLog;

const TURNS_HEADER: &str = "## Recent Conversation";
const MEMORIES_HEADER: &str = "## Relevant Context from Memory";

// ── Types ─────────────────────────────────────────────────────────────────

/// Items removed from one layer while enforcing the token budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropInfo {
    /// `recent_turns` or `relevant_memories`.
    pub layer: String,
    pub items_dropped: usize,
    /// Estimated tokens of the dropped content.
    pub tokens_dropped: usize,
}

/// The bounded input assembled for one request.
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    pub recent_turns: Vec<ConversationTurn>,
    /// Most relevant first.
    pub relevant_memories: Vec<MemoryRecord>,
    pub drops: Vec<DropInfo>,
}

impl ContextWindow {
    pub fn is_empty(&self) -> bool {
        self.recent_turns.is_empty() && self.relevant_memories.is_empty()
    }

    /// Render to the prompt text. Layers with no entries are omitted, so an
    /// empty window renders as the empty string.
    pub fn render(&self) -> String {
        let mut sections = Vec::with_capacity(2);

        if !self.recent_turns.is_empty() {
            let mut section = String::from(TURNS_HEADER);
            for turn in &self.recent_turns {
                section.push('\n');
                section.push_str(&render_turn(turn));
            }
            sections.push(section);
        }

        if !self.relevant_memories.is_empty() {
            let mut section = String::from(MEMORIES_HEADER);
            for (i, record) in self.relevant_memories.iter().enumerate() {
                section.push('\n');
                section.push_str(&render_memory(i + 1, record));
            }
            sections.push(section);
        }

        sections.join("\n\n")
    }

    /// Estimated tokens of the rendered window.
    pub fn estimated_tokens(&self) -> usize {
        token::estimate_tokens(&self.render())
    }

    /// Trim until the rendered window fits `budget` tokens.
    ///
    /// Memories go first, least relevant first; then the oldest turns.
    pub fn fit_to_budget(&mut self, budget: usize) {
        let mut memories_dropped = 0;
        let mut memory_tokens = 0;
        while self.estimated_tokens() > budget {
            let Some(record) = self.relevant_memories.pop() else {
                break;
            };
            memories_dropped += 1;
            memory_tokens += token::estimate_tokens(&record.content);
        }

        let mut turns_dropped = 0;
        let mut turn_tokens = 0;
        while self.estimated_tokens() > budget && !self.recent_turns.is_empty() {
            let turn = self.recent_turns.remove(0);
            turns_dropped += 1;
            turn_tokens += token::estimate_turn_tokens(&turn);
        }

        if memories_dropped > 0 {
            self.drops.push(DropInfo {
                layer: "relevant_memories".into(),
                items_dropped: memories_dropped,
                tokens_dropped: memory_tokens,
            });
        }
        if turns_dropped > 0 {
            self.drops.push(DropInfo {
                layer: "recent_turns".into(),
                items_dropped: turns_dropped,
                tokens_dropped: turn_tokens,
            });
        }
    }
}

fn render_turn(turn: &ConversationTurn) -> String {
    format!("{}: {}", turn.role, turn.content)
}

fn render_memory(position: usize, record: &MemoryRecord) -> String {
    format!("{position}. {}\n   (Source: {})", record.content, record.source)
}

// ── Conversation memory ───────────────────────────────────────────────────

/// Conversation log plus an optional long-term store for one persona.
///
/// The store is an optional collaborator: `None` when memory is unavailable,
/// and every call site branches on it explicitly. A separate switch turns an
/// available store off for the session (`--no-memory`).
pub struct ConversationMemory {
    persona: String,
    log: ConversationLog,
    store: Option<Arc<dyn LongTermStore>>,
    enabled: bool,
    memory_dir: Option<PathBuf>,
    token_budget: Option<usize>,
    failed_writes: usize,
}

impl ConversationMemory {
    /// Memory without a long-term store: recent turns only.
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            log: ConversationLog::new(),
            store: None,
            enabled: false,
            memory_dir: None,
            token_budget: None,
            failed_writes: 0,
        }
    }

    /// Memory backed by `store`, enabled.
    pub fn with_store(persona: impl Into<String>, store: Arc<dyn LongTermStore>) -> Self {
        Self {
            store: Some(store),
            enabled: true,
            ..Self::new(persona)
        }
    }

    /// Build from configuration, opening the configured backend under `dir`.
    pub fn from_config(persona: impl Into<String>, config: &MemoryConfig, dir: &Path) -> Self {
        let persona = persona.into();
        if !config.enabled {
            info!(persona = %persona, "Long-term memory disabled");
            return Self::new(persona).with_token_budget(config.token_budget);
        }

        let store = opentwin_memory::open_store(&config.backend, dir);
        info!(
            persona = %persona,
            backend = store.name(),
            dir = %dir.display(),
            "Long-term memory enabled"
        );
        Self::with_store(persona, store)
            .with_memory_dir(dir)
            .with_token_budget(config.token_budget)
    }

    pub fn with_memory_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.memory_dir = Some(dir.into());
        self
    }

    pub fn with_token_budget(mut self, budget: Option<usize>) -> Self {
        self.token_budget = budget;
        self
    }

    /// Switch the long-term store on or off for this session. Has no effect
    /// on availability: without a store, memory stays off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True when a store is present and switched on.
    pub fn memory_enabled(&self) -> bool {
        self.active_store().is_some()
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn failed_writes(&self) -> usize {
        self.failed_writes
    }

    fn active_store(&self) -> Option<&Arc<dyn LongTermStore>> {
        self.store.as_ref().filter(|_| self.enabled)
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    /// Assemble the structured context window for `query`.
    pub async fn assemble(&self, query: &str, max_turns: usize, max_memories: usize) -> ContextWindow {
        let recent_turns = self.log.recent(max_turns).to_vec();

        let relevant_memories = if max_memories > 0 && !query.trim().is_empty() {
            self.search(query, max_memories).await
        } else {
            Vec::new()
        };

        let mut window = ContextWindow {
            recent_turns,
            relevant_memories,
            drops: Vec::new(),
        };

        if let Some(budget) = self.token_budget {
            window.fit_to_budget(budget);
            for drop in &window.drops {
                debug!(
                    layer = %drop.layer,
                    items = drop.items_dropped,
                    tokens = drop.tokens_dropped,
                    budget,
                    "Context trimmed to budget"
                );
            }
        }

        window
    }

    /// Rendered context for `query`. Never fails; see [`ContextWindow::render`].
    pub async fn build_context(&self, query: &str, max_turns: usize, max_memories: usize) -> String {
        self.assemble(query, max_turns, max_memories).await.render()
    }

    /// Search the long-term store. Empty when memory is off or the store fails.
    pub async fn search(&self, query: &str, k: usize) -> Vec<MemoryRecord> {
        let Some(store) = self.active_store() else {
            return Vec::new();
        };
        match store.search(query, k).await {
            Ok(mut records) => {
                debug!(query, k, hits = records.len(), "Memory search");
                records.truncate(k);
                records
            }
            Err(e) => {
                warn!(error = %e, "Memory search failed, continuing without memories");
                Vec::new()
            }
        }
    }

    /// Session and store counters. Reading twice without writes in between
    /// yields identical maps.
    pub async fn stats(&self) -> MemoryStats {
        let mut stats = BTreeMap::new();
        stats.insert("persona".into(), self.persona.clone().into());
        stats.insert("memory_enabled".into(), self.memory_enabled().into());
        stats.insert("conversation_turns".into(), self.log.len().into());
        stats.insert(
            "memory_dir".into(),
            self.memory_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .into(),
        );
        stats.insert("failed_writes".into(), self.failed_writes.into());

        if let Some(store) = self.active_store() {
            for (key, value) in store.stats().await {
                stats.entry(key).or_insert(value);
            }
        }
        stats
    }

    // ── Writes ────────────────────────────────────────────────────────────

    /// Record a turn in the log, then forward assistant turns to the store.
    ///
    /// The local append always happens first and is never rolled back. The
    /// forward is best-effort: failures are logged and counted.
    pub async fn store_turn(&mut self, role: Role, content: &str, query: Option<&str>) -> Result<()> {
        let mut turn = ConversationTurn::new(role, content);
        if let Some(q) = query {
            turn = turn.with_query(q);
        }
        self.log.append(turn)?;

        if role != Role::Assistant || self.active_store().is_none() {
            return Ok(());
        }

        let document = format!("Q: {}\nA: {}", query.unwrap_or_default(), content);
        let mut metadata = BTreeMap::new();
        metadata.insert("conversation_turn".to_string(), self.log.len().to_string());
        if let Some(q) = query {
            metadata.insert("query".to_string(), q.to_string());
        }
        self.add_content(&document, "conversation", "conversation", metadata)
            .await;
        Ok(())
    }

    /// Ingest a document into the long-term store.
    ///
    /// Returns the record id, or `None` when memory is off or the write fails.
    pub async fn add_content(
        &mut self,
        content: &str,
        source: &str,
        content_type: &str,
        mut metadata: BTreeMap<String, String>,
    ) -> Option<String> {
        let store = self.active_store()?.clone();

        metadata.insert("source".into(), source.into());
        metadata.insert("content_type".into(), content_type.into());
        metadata.insert("persona".into(), self.persona.clone());
        metadata.insert("timestamp".into(), Utc::now().to_rfc3339());

        match store.add(content, source, metadata).await {
            Ok(id) => {
                debug!(id = %id, source, content_type, "Stored in long-term memory");
                Some(id)
            }
            Err(e) => {
                self.failed_writes += 1;
                warn!(
                    error = %e,
                    failed_writes = self.failed_writes,
                    "Long-term memory write failed"
                );
                None
            }
        }
    }

    /// Drop the session's turns. The long-term store is untouched.
    pub fn clear_conversation(&mut self) {
        self.log.clear();
        info!(persona = %self.persona, "Conversation history cleared");
    }

    /// Wipe the long-term store and the session's turns. Does nothing unless
    /// `confirm` is set and memory is on for this session.
    ///
    /// Returns whether a wipe happened.
    pub async fn reset_memory(&mut self, confirm: bool) -> std::result::Result<bool, MemoryError> {
        if !confirm {
            warn!("Memory reset requested without confirmation, ignoring");
            return Ok(false);
        }
        let Some(store) = self.active_store().cloned() else {
            warn!(persona = %self.persona, "Memory is off for this session, nothing to reset");
            return Ok(false);
        };
        self.log.clear();
        store.clear().await?;
        info!(persona = %self.persona, "Long-term memory reset");
        Ok(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
