//! Backend adapters.
//!
//! A run picks exactly one [`Backend`] up front and passes it down explicitly.
//! The variant decides how the prompt travels: free-text backends get the
//! fixed system instruction, schema-constrained backends get the collection
//! schema.

pub mod config;
pub mod gemini;
pub mod openai;

pub use config::BackendConfig;
pub use gemini::GeminiFlash;
pub use openai::{OpenAIChat, OpenAIStructured};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BackendResult, ExtractionError};
use crate::pipeline::prompts::SYSTEM_MESSAGE;
use crate::traits::backend::{FreeTextGenerator, SchemaGenerator};
use crate::types::schema::CollectionSchema;

/// Selectable backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// OpenAI chat completions, free text
    #[serde(rename = "gpt-4")]
    Gpt4,

    /// OpenAI chat completions with a strict `json_schema` response format
    #[serde(rename = "gpt-4o")]
    Gpt4o,

    /// Gemini `generateContent` with a `responseSchema`
    #[serde(rename = "gemini-flash")]
    GeminiFlash,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [Self::Gpt4, Self::Gpt4o, Self::GeminiFlash];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4 => "gpt-4",
            Self::Gpt4o => "gpt-4o",
            Self::GeminiFlash => "gemini-flash",
        }
    }

    /// Model sent to the provider unless overridden.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gpt4 => "gpt-4",
            Self::Gpt4o => "gpt-4o",
            Self::GeminiFlash => "gemini-1.5-flash",
        }
    }

    /// Environment variable that overrides the model.
    pub fn model_env_var(&self) -> &'static str {
        match self {
            Self::Gpt4 => "OPENAI_MODEL",
            Self::Gpt4o => "OPENAI_STRUCTURED_MODEL",
            Self::GeminiFlash => "GEMINI_MODEL",
        }
    }

    /// Environment variable holding the provider key.
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::Gpt4 | Self::Gpt4o => "OPENAI_API_KEY",
            Self::GeminiFlash => "GEMINI_API_KEY",
        }
    }

    pub fn is_schema_constrained(&self) -> bool {
        !matches!(self, Self::Gpt4)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                ExtractionError::Config(format!(
                    "unsupported backend '{}' (expected one of: {})",
                    wanted,
                    known.join(", ")
                ))
            })
    }
}

/// The backend selected for a run.
#[derive(Clone)]
pub enum Backend {
    FreeText(Arc<dyn FreeTextGenerator>),
    SchemaConstrained(Arc<dyn SchemaGenerator>),
}

impl Backend {
    /// Generate a response for one chunk prompt.
    pub async fn generate(&self, prompt: &str, schema: &CollectionSchema) -> BackendResult<String> {
        match self {
            Self::FreeText(backend) => backend.generate(prompt, SYSTEM_MESSAGE).await,
            Self::SchemaConstrained(backend) => backend.generate(prompt, schema).await,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::FreeText(backend) => backend.name(),
            Self::SchemaConstrained(backend) => backend.name(),
        }
    }

    pub fn is_schema_constrained(&self) -> bool {
        matches!(self, Self::SchemaConstrained(_))
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::FreeText(_) => "FreeText",
            Self::SchemaConstrained(_) => "SchemaConstrained",
        };
        f.debug_tuple(variant).field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use crate::types::schema::{build_schema, FieldSpec};

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("gpt-4".parse::<BackendKind>().unwrap(), BackendKind::Gpt4);
        assert_eq!("GPT-4o".parse::<BackendKind>().unwrap(), BackendKind::Gpt4o);
        assert_eq!(
            " gemini-flash ".parse::<BackendKind>().unwrap(),
            BackendKind::GeminiFlash
        );

        let err = "claude".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, ExtractionError::Config(msg) if msg.contains("claude")));
    }

    #[test]
    fn test_backend_kind_display_round_trips() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[tokio::test]
    async fn test_free_text_gets_system_instruction() {
        let mock = MockBackend::new().reply("ok");
        let (_, schema) = build_schema(&FieldSpec::new(["name"]).unwrap());

        let backend = mock.free_text();
        assert!(!backend.is_schema_constrained());
        assert_eq!(backend.generate("prompt", &schema).await.unwrap(), "ok");

        let calls = mock.calls();
        assert_eq!(calls[0].system_instruction.as_deref(), Some(SYSTEM_MESSAGE));
        assert!(calls[0].schema.is_none());
    }

    #[tokio::test]
    async fn test_schema_constrained_gets_schema() {
        let mock = MockBackend::new();
        let (_, schema) = build_schema(&FieldSpec::new(["name"]).unwrap());

        let backend = mock.schema_constrained();
        assert!(backend.is_schema_constrained());
        backend.generate("prompt", &schema).await.unwrap();

        assert_eq!(mock.calls()[0].schema, Some(schema.to_json_schema()));
    }
}
