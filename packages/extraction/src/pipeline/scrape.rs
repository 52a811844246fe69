//! URL entry point: fetch, normalize, extract.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{ExtractionError, Result};
use crate::pipeline::extractor::{ExtractionResult, Extractor};
use crate::traits::fetcher::{Normalizer, PageFetcher};
use crate::types::schema::FieldSpec;

/// Fetches a page and runs the extractor over its normalized text.
#[derive(Clone)]
pub struct Scraper {
    fetcher: Arc<dyn PageFetcher>,
    normalizer: Arc<dyn Normalizer>,
    extractor: Extractor,
}

impl Scraper {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        normalizer: Arc<dyn Normalizer>,
        extractor: Extractor,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            extractor,
        }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Scrape `url` for `field_names`.
    ///
    /// Field names are validated before the page is fetched.
    pub async fn scrape<I, S>(
        &self,
        url: &str,
        field_names: I,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = FieldSpec::new(field_names)?;

        let markup = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
            markup = self.fetcher.fetch(url) => markup?,
        };
        let text = self.normalizer.normalize(&markup);
        info!(
            url = %url,
            fetcher = self.fetcher.name(),
            markup_bytes = markup.len(),
            text_bytes = text.len(),
            "Page fetched and normalized"
        );

        self.extractor.extract_fields(&text, &fields, cancel).await
    }
}
