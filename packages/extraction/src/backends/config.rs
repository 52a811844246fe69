//! Backend configuration loaded once from the environment.

use std::sync::Arc;
use std::time::Duration;

use gemini_client::GeminiClient;
use openai_client::OpenAIClient;
use tracing::info;

use super::{Backend, BackendKind, GeminiFlash, OpenAIChat, OpenAIStructured};
use crate::error::{BackendError, ExtractionError, Result};
use crate::security::credentials::{ProviderCredentials, SecretString};

/// HTTP deadline applied by the provider clients.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Credentials and endpoints for every provider.
///
/// Keys that are missing only matter once the matching backend is selected;
/// [`BackendConfig::build_backend`] fails before any chunk is sent.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub openai_api_key: Option<SecretString>,
    pub gemini_api_key: Option<SecretString>,
    pub openai_base_url: Option<String>,
    pub gemini_base_url: Option<String>,

    /// Model overrides keyed by `BackendKind::model_env_var`
    pub openai_model: Option<String>,
    pub openai_structured_model: Option<String>,
    pub gemini_model: Option<String>,

    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            gemini_api_key: None,
            openai_base_url: None,
            gemini_base_url: None,
            openai_model: None,
            openai_structured_model: None,
            gemini_model: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl BackendConfig {
    /// Load from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let request_timeout = match text("BACKEND_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ExtractionError::Config(format!(
                        "BACKEND_TIMEOUT_SECS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        Ok(Self {
            openai_api_key: SecretString::from_lookup(&lookup, "OPENAI_API_KEY"),
            gemini_api_key: SecretString::from_lookup(&lookup, "GEMINI_API_KEY"),
            openai_base_url: text("OPENAI_BASE_URL"),
            gemini_base_url: text("GEMINI_BASE_URL"),
            openai_model: text(BackendKind::Gpt4.model_env_var()),
            openai_structured_model: text(BackendKind::Gpt4o.model_env_var()),
            gemini_model: text(BackendKind::GeminiFlash.model_env_var()),
            request_timeout,
        })
    }

    pub fn with_openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(SecretString::new(key));
        self
    }

    pub fn with_gemini_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(SecretString::new(key));
        self
    }

    pub fn with_openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = Some(url.into());
        self
    }

    pub fn with_gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_base_url = Some(url.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Model that `kind` will call.
    pub fn model_for(&self, kind: BackendKind) -> String {
        let configured = match kind {
            BackendKind::Gpt4 => &self.openai_model,
            BackendKind::Gpt4o => &self.openai_structured_model,
            BackendKind::GeminiFlash => &self.gemini_model,
        };
        configured
            .clone()
            .unwrap_or_else(|| kind.default_model().to_string())
    }

    /// Credentials for `kind`, or a config error naming the missing variable.
    pub fn credentials(&self, kind: BackendKind) -> Result<ProviderCredentials> {
        let (key, base_url) = match kind {
            BackendKind::Gpt4 | BackendKind::Gpt4o => (&self.openai_api_key, &self.openai_base_url),
            BackendKind::GeminiFlash => (&self.gemini_api_key, &self.gemini_base_url),
        };
        let api_key = key.clone().ok_or_else(|| {
            ExtractionError::Config(format!(
                "{} is not set; required for backend {}",
                kind.api_key_env_var(),
                kind
            ))
        })?;

        Ok(ProviderCredentials {
            api_key,
            model: self.model_for(kind),
            base_url: base_url.clone(),
        })
    }

    /// Build the backend for `kind`.
    pub fn build_backend(&self, kind: BackendKind) -> Result<Backend> {
        let creds = self.credentials(kind)?;
        info!(backend = %kind, model = %creds.model, "Backend configured");

        let timeout = self.request_timeout;
        let backend = match kind {
            BackendKind::Gpt4 => Backend::FreeText(Arc::new(
                OpenAIChat::new(self.openai_client(&creds), creds.model)
                    .with_request_timeout(timeout)
                    .map_err(client_error)?,
            )),
            BackendKind::Gpt4o => Backend::SchemaConstrained(Arc::new(
                OpenAIStructured::new(self.openai_client(&creds), creds.model)
                    .with_request_timeout(timeout)
                    .map_err(client_error)?,
            )),
            BackendKind::GeminiFlash => Backend::SchemaConstrained(Arc::new(
                GeminiFlash::new(self.gemini_client(&creds), creds.model)
                    .with_request_timeout(timeout)
                    .map_err(client_error)?,
            )),
        };
        Ok(backend)
    }

    fn openai_client(&self, creds: &ProviderCredentials) -> OpenAIClient {
        let client = OpenAIClient::new(creds.api_key.expose());
        match &creds.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }

    fn gemini_client(&self, creds: &ProviderCredentials) -> GeminiClient {
        let client = GeminiClient::new(creds.api_key.expose());
        match &creds.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }
}

fn client_error(e: BackendError) -> ExtractionError {
    ExtractionError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_empty_environment() {
        let config = BackendConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.openai_api_key.is_none());
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.model_for(BackendKind::GeminiFlash), "gemini-1.5-flash");
    }

    #[test]
    fn test_model_overrides() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("OPENAI_MODEL", "gpt-4-turbo"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
        ]))
        .unwrap();
        assert_eq!(config.model_for(BackendKind::Gpt4), "gpt-4-turbo");
        assert_eq!(config.model_for(BackendKind::Gpt4o), "gpt-4o");
        assert_eq!(config.model_for(BackendKind::GeminiFlash), "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_timeout() {
        let err = BackendConfig::from_lookup(lookup(&[("BACKEND_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ExtractionError::Config(_)));

        let config = BackendConfig::from_lookup(lookup(&[("BACKEND_TIMEOUT_SECS", "30")])).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_key_names_variable() {
        let config = BackendConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert!(config.build_backend(BackendKind::Gpt4).is_ok());
        match config.build_backend(BackendKind::GeminiFlash).unwrap_err() {
            ExtractionError::Config(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_backend_variants() {
        let config = BackendConfig::default()
            .with_openai_key("sk-test")
            .with_gemini_key("g-test");

        assert!(!config.build_backend(BackendKind::Gpt4).unwrap().is_schema_constrained());
        assert!(config.build_backend(BackendKind::Gpt4o).unwrap().is_schema_constrained());
        assert!(config
            .build_backend(BackendKind::GeminiFlash)
            .unwrap()
            .is_schema_constrained());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = BackendConfig::default().with_openai_key("sk-very-secret");
        assert!(!format!("{:?}", config).contains("sk-very-secret"));
    }
}
