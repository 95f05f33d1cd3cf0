//! Shared fakes for agent tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use opentwin_core::{
    LlmClient, LlmRequest, LlmResponse, LongTermStore, MemoryError, MemoryRecord, MemoryStats,
    ProviderError, Usage,
};
use opentwin_memory::InMemoryStore;

/// An LLM client that replays scripted responses in order and records every
/// request it receives.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedClient {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!(
                "ScriptedClient: no more responses (call #{})",
                requests.len() + 1
            );
        }
        requests.push(request);
        let content = responses.remove(0)?;
        Ok(LlmResponse {
            content,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// In-memory store that counts every trait call.
pub struct CountingStore {
    inner: InMemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LongTermStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    async fn add(
        &self,
        content: &str,
        source: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<String, MemoryError> {
        self.hit();
        self.inner.add(content, source, metadata).await
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        self.hit();
        self.inner.search(query, k).await
    }

    async fn stats(&self) -> MemoryStats {
        self.hit();
        self.inner.stats().await
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.hit();
        self.inner.clear().await
    }
}

/// A store whose every fallible call fails.
pub struct FailingStore;

#[async_trait::async_trait]
impl LongTermStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn add(
        &self,
        _content: &str,
        _source: &str,
        _metadata: BTreeMap<String, String>,
    ) -> Result<String, MemoryError> {
        Err(MemoryError::Unavailable("store offline".into()))
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        Err(MemoryError::QueryFailed("store offline".into()))
    }

    async fn stats(&self) -> MemoryStats {
        MemoryStats::from([("backend".to_string(), serde_json::json!("failing"))])
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        Err(MemoryError::Unavailable("store offline".into()))
    }
}

/// A store that ignores `k` and returns every record it was built with.
pub struct OverfullStore {
    records: Vec<MemoryRecord>,
}

impl OverfullStore {
    pub fn with_records(n: usize) -> Self {
        let records = (0..n)
            .map(|i| MemoryRecord::new(i.to_string(), format!("rates note {i}"), "notes", BTreeMap::new()))
            .collect();
        Self { records }
    }
}

#[async_trait::async_trait]
impl LongTermStore for OverfullStore {
    fn name(&self) -> &str {
        "overfull"
    }

    async fn add(
        &self,
        _content: &str,
        _source: &str,
        _metadata: BTreeMap<String, String>,
    ) -> Result<String, MemoryError> {
        Ok("ignored".into())
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<MemoryRecord>, MemoryError> {
        Ok(self.records.clone())
    }

    async fn stats(&self) -> MemoryStats {
        MemoryStats::from([("total_memories".to_string(), serde_json::json!(self.records.len()))])
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        Ok(())
    }
}
