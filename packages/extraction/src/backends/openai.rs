//! OpenAI adapters.

use std::time::Duration;

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError, StructuredRequest};
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::pipeline::prompts::SYSTEM_MESSAGE;
use crate::traits::backend::{FreeTextGenerator, SchemaGenerator};
use crate::types::schema::CollectionSchema;

/// Name reported to OpenAI for the listings response format.
pub const SCHEMA_NAME: &str = "DynamicListingsContainer";

/// A client deadline only maps to [`BackendError::Timeout`] when its length
/// is known.
fn backend_error(e: OpenAIError, request_timeout: Option<Duration>) -> BackendError {
    match e {
        OpenAIError::Config(msg) => BackendError::Config(msg),
        OpenAIError::Network(msg) => BackendError::Network(msg),
        OpenAIError::Timeout => match request_timeout {
            Some(timeout) => BackendError::Timeout(timeout),
            None => BackendError::Network("HTTP client deadline exceeded".into()),
        },
        OpenAIError::Auth(msg) => BackendError::Auth(msg),
        OpenAIError::Api(msg) | OpenAIError::Parse(msg) => BackendError::Rejected(msg),
    }
}

/// Free-text chat completions.
#[derive(Clone)]
pub struct OpenAIChat {
    client: OpenAIClient,
    model: String,
    request_timeout: Option<Duration>,
}

impl OpenAIChat {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
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
impl FreeTextGenerator for OpenAIChat {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> BackendResult<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system_instruction))
            .message(Message::user(prompt));

        let response = self
            .client
            .chat_completion(request)
            .await
            .map_err(|e| backend_error(e, self.request_timeout))?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Chat completion usage"
            );
        }
        Ok(response.content)
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}

/// Chat completions constrained by a strict JSON schema.
#[derive(Clone)]
pub struct OpenAIStructured {
    client: OpenAIClient,
    model: String,
    request_timeout: Option<Duration>,
}

impl OpenAIStructured {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
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
impl SchemaGenerator for OpenAIStructured {
    async fn generate(&self, prompt: &str, schema: &CollectionSchema) -> BackendResult<String> {
        let request =
            StructuredRequest::new(&self.model, SYSTEM_MESSAGE, prompt, schema.to_json_schema())
                .with_schema_name(SCHEMA_NAME);

        self.client
            .structured_output(request)
            .await
            .map_err(|e| backend_error(e, self.request_timeout))
    }

    fn name(&self) -> &str {
        "openai-structured"
    }
}
