//! File-based long-term store — persistent JSON-lines storage.
//!
//! Each line of `<dir>/memories.jsonl` is one JSON-encoded `MemoryRecord`.
//! Records are loaded on open and the whole file is rewritten on every
//! mutation, through a temp file renamed over the original, so a crash
//! mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use opentwin_core::{LongTermStore, MemoryError, MemoryRecord, MemoryStats};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::scoring;

const FILE_NAME: &str = "memories.jsonl";

pub struct FileStore {
    path: PathBuf,
    records: Arc<RwLock<Vec<MemoryRecord>>>,
    skipped_lines: usize,
}

impl FileStore {
    /// Open (or lazily create) the store in `dir`.
    ///
    /// A missing file starts empty; it is created on first write.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(FILE_NAME);
        let (records, skipped_lines) = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "File memory store loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
            skipped_lines,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> (Vec<MemoryRecord>, usize) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return (Vec::new(), 0),
        };

        let mut skipped = 0;
        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MemoryRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory record");
                    skipped += 1;
                    None
                }
            })
            .collect();
        (records, skipped)
    }

    fn flush(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| MemoryError::Storage("memory path has no parent directory".into()))?;
        std::fs::create_dir_all(dir).map_err(|e| {
            MemoryError::Storage(format!("Failed to create memory directory: {e}"))
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| MemoryError::Storage(format!("Failed to create temp file: {e}")))?;
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize memory record: {e}"))
            })?;
            writeln!(tmp, "{line}")
                .map_err(|e| MemoryError::Storage(format!("Failed to write memory file: {e}")))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| MemoryError::Storage(format!("Failed to sync memory file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| MemoryError::Storage(format!("Failed to replace memory file: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl LongTermStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn add(
        &self,
        content: &str,
        source: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String, MemoryError> {
        let id = Uuid::new_v4().to_string();
        let mut records = self.records.write().await;
        records.push(MemoryRecord::new(id.clone(), content, source, metadata));
        if let Err(e) = self.flush(&records) {
            records.pop();
            return Err(e);
        }
        Ok(id)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        let records = self.records.read().await;
        Ok(scoring::rank(records.iter(), query, k))
    }

    async fn stats(&self) -> MemoryStats {
        let records = self.records.read().await;
        let mut sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();

        MemoryStats::from([
            ("backend".to_string(), serde_json::json!(self.name())),
            ("total_memories".to_string(), serde_json::json!(records.len())),
            ("distinct_sources".to_string(), serde_json::json!(sources.len())),
            ("skipped_lines".to_string(), serde_json::json!(self.skipped_lines)),
            ("path".to_string(), serde_json::json!(self.path.display().to_string())),
        ])
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        let mut records = self.records.write().await;
        self.flush(&[])?;
        records.clear();
        Ok(())
    }
}
