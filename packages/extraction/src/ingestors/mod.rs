//! Page acquisition implementations.
//!
//! - `HttpFetcher` - single GET over plain HTTP(S)
//! - `MarkdownNormalizer` - markup to markdown, links reduced to their text
//!
//! # Example
//!
//! ```rust,ignore
//! use extraction::ingestors::{HttpFetcher, MarkdownNormalizer};
//! use extraction::traits::fetcher::{Normalizer, PageFetcher};
//!
//! let html = HttpFetcher::new()?.fetch("https://example.com").await?;
//! let text = MarkdownNormalizer.normalize(&html);
//! ```

mod http;
mod markdown;

pub use http::HttpFetcher;
pub use markdown::MarkdownNormalizer;
