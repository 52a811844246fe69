//! Gemini adapter.

use std::time::Duration;

use async_trait::async_trait;
use gemini_client::{GeminiClient, GeminiError, GenerateRequest};

use crate::error::{BackendError, BackendResult};
use crate::traits::backend::SchemaGenerator;
use crate::types::schema::CollectionSchema;

fn backend_error(e: GeminiError, request_timeout: Option<Duration>) -> BackendError {
    match e {
        GeminiError::Config(msg) => BackendError::Config(msg),
        GeminiError::Network(msg) => BackendError::Network(msg),
        GeminiError::Timeout => match request_timeout {
            Some(timeout) => BackendError::Timeout(timeout),
            None => BackendError::Network("HTTP client deadline exceeded".into()),
        },
        GeminiError::Auth(msg) => BackendError::Auth(msg),
        GeminiError::Blocked(reason) => {
            BackendError::Rejected(format!("content blocked: {}", reason))
        }
        GeminiError::Api(msg) | GeminiError::Parse(msg) => BackendError::Rejected(msg),
    }
}

/// `generateContent` with the collection schema as `responseSchema`.
#[derive(Clone)]
pub struct GeminiFlash {
    client: GeminiClient,
    model: String,
    request_timeout: Option<Duration>,
}

impl GeminiFlash {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            request_timeout: None,
        }
    }

    /// Apply a deadline to every request; an expired one fails the call with
    /// [`BackendError::Timeout`].
    pub fn with_request_timeout(mut self, timeout: Duration) -> BackendResult<Self> {
        self.client = self
            .client
            .with_timeout(timeout)
            .map_err(|e| backend_error(e, None))?;
        self.request_timeout = Some(timeout);
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl SchemaGenerator for GeminiFlash {
    async fn generate(&self, prompt: &str, schema: &CollectionSchema) -> BackendResult<String> {
        let request = GenerateRequest::user(prompt).json_schema(schema.to_gemini_schema());
        self.client
            .generate_text(&self.model, request)
            .await
            .map_err(|e| backend_error(e, self.request_timeout))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
