//! Plain HTTP page fetcher.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ExtractionError, FetchError, FetchResult, Result};
use crate::traits::fetcher::PageFetcher;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; UniversalScraper/0.1)";

/// Fetches page markup with a single GET.
///
/// No JavaScript runs, so pages that render client-side come back mostly
/// empty. Only `http` and `https` URLs are accepted.
///
/// ```rust,ignore
/// use extraction::ingestors::HttpFetcher;
///
/// let fetcher = HttpFetcher::new()?.with_user_agent("MyBot/1.0");
/// let html = fetcher.fetch("https://example.com/listings").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with a 30s request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractionError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

fn validate_url(url: &str) -> FetchResult<Url> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
        url: url.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl {
            url: url.to_string(),
        }),
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        let target = validate_url(url)?;
        debug!(url = %target, "HTTP fetch starting");

        let response = self
            .client
            .get(target)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "HTTP request failed");
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(Box::new(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "HTTP fetch returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        debug!(url = %url, bytes = html.len(), "HTTP fetch complete");
        Ok(html)
    }

    fn name(&self) -> &str {
        "http"
    }
}
