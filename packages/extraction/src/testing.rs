//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the extraction library
//! without making real backend or network calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::backends::Backend;
use crate::error::{BackendError, BackendResult, FetchError, FetchResult};
use crate::traits::{
    backend::{FreeTextGenerator, SchemaGenerator},
    fetcher::PageFetcher,
    tokenizer::{Token, Tokenizer},
};
use crate::types::schema::CollectionSchema;

/// What a mock backend does for one call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this text
    Text(String),

    /// Fail with a backend-side rejection
    Fail(String),

    /// Never answer
    Hang,
}

/// Record of a call made to the mock backend.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub schema: Option<serde_json::Value>,
}

/// A scripted backend for testing.
///
/// Replies are chosen per call: the first `when_prompt_contains` rule whose
/// needle occurs in the prompt wins, otherwise the next queued reply, otherwise
/// an empty `{"listings": []}`. Clones share state, so a clone handed to the
/// pipeline can be inspected afterwards.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Replies consumed in call order
    queue: Arc<Mutex<VecDeque<MockReply>>>,

    /// Prompt-matched replies, checked before the queue
    rules: Arc<RwLock<Vec<(String, MockReply)>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockCall>>>,
    call_count: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(MockReply::Text(text.into()))
    }

    /// Queue a failing call.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(MockReply::Fail(message.into()))
    }

    /// Queue a call that never completes.
    pub fn hang(self) -> Self {
        self.push(MockReply::Hang)
    }

    /// Answer every prompt containing `needle` with `reply`.
    pub fn when_prompt_contains(self, needle: impl Into<String>, reply: MockReply) -> Self {
        self.rules.write().unwrap().push((needle.into(), reply));
        self
    }

    fn push(self, reply: MockReply) -> Self {
        self.queue.lock().unwrap().push_back(reply);
        self
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Wrap as a free-text backend.
    pub fn free_text(&self) -> Backend {
        Backend::FreeText(Arc::new(self.clone()))
    }

    /// Wrap as a schema-constrained backend.
    pub fn schema_constrained(&self) -> Backend {
        Backend::SchemaConstrained(Arc::new(self.clone()))
    }

    async fn respond(&self, call: MockCall) -> BackendResult<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let matched = self
            .rules
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| call.prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());
        let reply = matched
            .or_else(|| self.queue.lock().unwrap().pop_front())
            .unwrap_or_else(|| MockReply::Text(r#"{"listings": []}"#.to_string()));

        self.calls.write().unwrap().push(call);

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(message) => Err(BackendError::Rejected(message)),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl FreeTextGenerator for MockBackend {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> BackendResult<String> {
        self.respond(MockCall {
            prompt: prompt.to_string(),
            system_instruction: Some(system_instruction.to_string()),
            schema: None,
        })
        .await
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[async_trait]
impl SchemaGenerator for MockBackend {
    async fn generate(&self, prompt: &str, schema: &CollectionSchema) -> BackendResult<String> {
        self.respond(MockCall {
            prompt: prompt.to_string(),
            system_instruction: None,
            schema: Some(schema.to_json_schema()),
        })
        .await
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// One token per Unicode scalar value. Lossless on any split.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<Token> {
        text.chars().map(u32::from).collect()
    }

    fn decode(&self, tokens: &[Token]) -> String {
        tokens.iter().filter_map(|t| char::from_u32(*t)).collect()
    }

    fn name(&self) -> &str {
        "char"
    }
}

/// A mock page fetcher serving fixed markup by URL.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, String>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `markup` for `url`.
    pub fn with_page(self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), markup.into());
        self
    }

    /// Number of fetches made so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
