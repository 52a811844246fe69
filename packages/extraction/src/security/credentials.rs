//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate so API keys never end up in logs, `Debug` output
//! or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// A secret string that won't be logged or displayed.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Read a secret from a lookup, treating blank values as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, var: &str) -> Option<Self> {
        lookup(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    /// Only call this at the point the key goes on the wire.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Everything needed to open a client against one provider.
#[derive(Clone)]
pub struct ProviderCredentials {
    /// API key (secret)
    pub api_key: SecretString,

    /// Model identifier sent with each request
    pub model: String,

    /// Endpoint override for proxies and test servers
    pub base_url: Option<String>,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &self.api_key)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let secret = SecretString::new("sk-super-secret-key");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "sk-super-secret-key");
    }

    #[test]
    fn test_blank_lookup_is_absent() {
        let lookup = |var: &str| match var {
            "BLANK" => Some("   ".to_string()),
            "SET" => Some(" key ".to_string()),
            _ => None,
        };
        assert!(SecretString::from_lookup(lookup, "BLANK").is_none());
        assert!(SecretString::from_lookup(lookup, "MISSING").is_none());
        assert_eq!(SecretString::from_lookup(lookup, "SET").unwrap().expose(), "key");
    }

    #[test]
    fn test_provider_credentials_debug() {
        let creds = ProviderCredentials {
            api_key: SecretString::from("sk-secret"),
            model: "gpt-4".into(),
            base_url: None,
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4"));
    }
}
