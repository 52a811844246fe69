//! End-to-end extraction: fields + text in, table out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::backends::{Backend, BackendConfig, BackendKind};
use crate::error::Result;
use crate::pipeline::chunk::{BpeTokenizer, TokenChunker};
use crate::pipeline::merge::{merge_responses, ChunkFailure, MergeStats};
use crate::pipeline::orchestrate::extract_chunks;
use crate::traits::tokenizer::Tokenizer;
use crate::types::config::ExtractionConfig;
use crate::types::schema::{build_schema, FieldSpec};
use crate::types::table::ExtractionTable;

/// What happened during one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Backend name used for the run
    pub backend: String,

    pub total_tokens: usize,
    pub chunks: usize,

    /// Chunks whose response parsed as JSON
    pub chunks_parsed: usize,

    pub records: usize,

    /// Per-chunk failures in chunk order
    pub failures: Vec<ChunkFailure>,

    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl ExtractionReport {
    pub fn call_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f, ChunkFailure::Call { .. }))
            .count()
    }

    pub fn parse_failures(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f, ChunkFailure::Parse { .. }))
            .count()
    }

    fn from_stats(backend: &str, total_tokens: usize, chunks: usize, stats: MergeStats) -> Self {
        Self {
            backend: backend.to_string(),
            total_tokens,
            chunks,
            chunks_parsed: stats.parsed,
            records: stats.records,
            failures: stats.failures,
            elapsed: Duration::ZERO,
        }
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Table plus run report.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub table: ExtractionTable,
    pub report: ExtractionReport,
}

/// Runs the pipeline against one backend.
///
/// ```rust,ignore
/// let extractor = Extractor::from_config(&BackendConfig::from_env()?, BackendKind::Gpt4, ExtractionConfig::default())?;
/// let result = extractor.extract(&page_text, ["title", "price"]).await?;
/// println!("{}", result.table);
/// ```
#[derive(Clone)]
pub struct Extractor {
    backend: Backend,
    tokenizer: Arc<dyn Tokenizer>,
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(
        backend: Backend,
        tokenizer: Arc<dyn Tokenizer>,
        config: ExtractionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            tokenizer,
            config,
        })
    }

    /// Build the backend for `kind` and pair it with the `cl100k_base` tokenizer.
    ///
    /// Fails with a config error if `kind` has no credentials.
    pub fn from_config(
        backend_config: &BackendConfig,
        kind: BackendKind,
        config: ExtractionConfig,
    ) -> Result<Self> {
        let backend = backend_config.build_backend(kind)?;
        let tokenizer = Arc::new(BpeTokenizer::cl100k()?);
        Self::new(backend, tokenizer, config)
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract `field_names` from `text`.
    pub async fn extract<I, S>(&self, text: &str, field_names: I) -> Result<ExtractionResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = FieldSpec::new(field_names)?;
        self.extract_fields(text, &fields, &CancellationToken::new())
            .await
    }

    /// [`Extractor::extract`] that stops when `cancel` fires.
    pub async fn extract_with_cancel<I, S>(
        &self,
        text: &str,
        field_names: I,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = FieldSpec::new(field_names)?;
        self.extract_fields(text, &fields, cancel).await
    }

    /// Extract an already validated field list.
    pub async fn extract_fields(
        &self,
        text: &str,
        fields: &FieldSpec,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let start = Instant::now();
        let (_, schema) = build_schema(fields);
        let chunks = TokenChunker::new(self.tokenizer.clone(), self.config.max_tokens_per_chunk)?
            .chunk(text);
        let total_tokens = chunks.iter().map(|c| c.token_count()).sum();

        info!(
            backend = self.backend.name(),
            fields = fields.len(),
            chunks = chunks.len(),
            total_tokens,
            "Starting extraction"
        );

        let responses = extract_chunks(
            &chunks,
            fields,
            &schema,
            &self.backend,
            &self.config,
            cancel,
        )
        .await?;

        let (table, stats) = merge_responses(&responses, fields);
        let mut report =
            ExtractionReport::from_stats(self.backend.name(), total_tokens, chunks.len(), stats);
        report.elapsed = start.elapsed();

        info!(
            records = report.records,
            call_failures = report.call_failures(),
            parse_failures = report.parse_failures(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Extraction complete"
        );

        Ok(ExtractionResult { table, report })
    }
}
