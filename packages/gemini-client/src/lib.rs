//! Pure Google Gemini REST API client
//!
//! A minimal client for the Gemini `generateContent` endpoint, shaped like
//! `openai-client`: no domain logic, typed errors, JSON-schema constrained
//! responses through `generationConfig.responseSchema`.
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_client::{GeminiClient, GenerateRequest};
//!
//! let client = GeminiClient::new(api_key);
//! let text = client
//!     .generate_text("gemini-1.5-flash", GenerateRequest::user("Hello").json_schema(schema))
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Pure Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (for proxies or a local emulator).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a deadline to every request made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeminiError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `models/{model}:generateContent` and return the raw response.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Gemini request failed");
                GeminiError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let err = classify_error(status, &error_text);
            warn!(status = %status, error = %err, "Gemini API error");
            return Err(err);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeminiError::Timeout
                } else {
                    GeminiError::Parse(e.to_string())
                }
            })?;

        debug!(
            model = %model,
            duration_ms = start.elapsed().as_millis(),
            total_tokens = body.usage_metadata.as_ref().map(|u| u.total_token_count),
            "Gemini generateContent"
        );

        Ok(body)
    }

    /// Generate and return the first candidate's text.
    ///
    /// A blocked prompt or a response without any text part is an error.
    pub async fn generate_text(&self, model: &str, request: GenerateRequest) -> Result<String> {
        let response = self.generate_content(model, &request).await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(GeminiError::Blocked(reason));
        }

        match response.first_text() {
            Some(text) => Ok(text.to_string()),
            None => {
                let finish_reason = response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .unwrap_or_else(|| "NO_CANDIDATES".to_string());
                if finish_reason == "SAFETY" {
                    Err(GeminiError::Blocked(finish_reason))
                } else {
                    Err(GeminiError::Api(format!(
                        "No text in Gemini response (finish reason: {})",
                        finish_reason
                    )))
                }
            }
        }
    }
}

fn classify_error(status: StatusCode, body: &str) -> GeminiError {
    let (message, api_status) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (body.to_string(), None),
    };

    let key_rejected = message.contains("API key") || api_status.as_deref() == Some("UNAUTHENTICATED");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GeminiError::Auth(message),
        StatusCode::BAD_REQUEST if key_rejected => GeminiError::Auth(message),
        _ => GeminiError::Api(format!("Gemini API error ({}): {}", status, message)),
    }
}
