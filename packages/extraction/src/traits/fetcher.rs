//! Page acquisition collaborators.
//!
//! The pipeline only needs "URL in, markup out" and "markup in, readable text
//! out". Browser sessions, crawling and site rules live outside this library.
//!
//! ```rust,ignore
//! let markup = fetcher.fetch("https://example.com/listings").await?;
//! let text = normalizer.normalize(&markup);
//! ```

use async_trait::async_trait;

use crate::error::FetchResult;

/// Fetches the raw markup of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<String>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Turns raw markup into readable text with navigation and markup noise removed.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, markup: &str) -> String;
}
