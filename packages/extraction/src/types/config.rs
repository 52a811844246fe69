//! Configuration for an extraction run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};

/// Token budget per chunk when none is given.
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 3000;

/// Deadline for one backend call when none is given.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum tokens in one chunk sent to the backend.
    ///
    /// Must be positive. Default: 3000.
    pub max_tokens_per_chunk: usize,

    /// Backend calls allowed in flight at once.
    ///
    /// 1 processes chunks strictly one after another. Higher values keep the
    /// chunk order of the results. Default: 1.
    pub concurrency: usize,

    /// Deadline for a single backend call. A call that runs past it counts as
    /// a failed chunk. Default: 120s.
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
            concurrency: 1,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl ExtractionConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk token budget.
    pub fn with_max_tokens_per_chunk(mut self, max_tokens: usize) -> Self {
        self.max_tokens_per_chunk = max_tokens;
        self
    }

    /// Set how many chunks may be in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Reject settings that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens_per_chunk == 0 {
            return Err(ExtractionError::input(
                "max_tokens_per_chunk must be a positive integer",
            ));
        }
        if self.concurrency == 0 {
            return Err(ExtractionError::input("concurrency must be at least 1"));
        }
        if self.call_timeout.is_zero() {
            return Err(ExtractionError::input("call_timeout must be non-zero"));
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.max_tokens_per_chunk, 3000);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.call_timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = ExtractionConfig::new()
            .with_max_tokens_per_chunk(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Input { .. }));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(ExtractionConfig::new().with_concurrency(0).validate().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = ExtractionConfig::new().with_call_timeout(Duration::from_secs(30));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"call_timeout\":30"));
        let back: ExtractionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.call_timeout, Duration::from_secs(30));
    }
}
