//! Chunk orchestration.
//!
//! Each chunk gets its own prompt and its own backend call. A call that
//! fails, runs past its deadline or comes back blank is logged and recorded,
//! and the remaining chunks carry on. With `concurrency > 1` calls overlap
//! but results still come back in chunk order.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backends::Backend;
use crate::error::{BackendError, ExtractionError, Result};
use crate::pipeline::chunk::Chunk;
use crate::pipeline::prompts::format_extract_prompt;
use crate::types::config::ExtractionConfig;
use crate::types::schema::{CollectionSchema, FieldSpec};

/// Outcome of the backend call for one chunk.
#[derive(Debug)]
pub struct BackendResponse {
    /// 1-based chunk index
    pub chunk: usize,

    pub outcome: std::result::Result<String, BackendError>,
}

impl BackendResponse {
    pub fn ok(chunk: usize, text: impl Into<String>) -> Self {
        Self {
            chunk,
            outcome: Ok(text.into()),
        }
    }

    pub fn failed(chunk: usize, error: BackendError) -> Self {
        Self {
            chunk,
            outcome: Err(error),
        }
    }

    /// Raw text, if the call produced any.
    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }
}

/// Run every chunk through `backend`, returning one response per chunk in
/// chunk order.
///
/// Only cancellation aborts the run; per-chunk failures are folded into the
/// returned responses.
pub async fn extract_chunks(
    chunks: &[Chunk],
    fields: &FieldSpec,
    schema: &CollectionSchema,
    backend: &Backend,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
) -> Result<Vec<BackendResponse>> {
    if cancel.is_cancelled() {
        return Err(ExtractionError::Cancelled);
    }

    let concurrency = config.concurrency.max(1);
    debug!(
        chunks = chunks.len(),
        concurrency,
        backend = backend.name(),
        "Dispatching chunks"
    );

    let calls = chunks
        .iter()
        .map(|chunk| call_chunk(chunk, fields, schema, backend, config.call_timeout));
    let run = stream::iter(calls).buffered(concurrency).collect::<Vec<_>>();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(backend = backend.name(), "Extraction cancelled; dropping outstanding chunk calls");
            Err(ExtractionError::Cancelled)
        }
        responses = run => Ok(responses),
    }
}

async fn call_chunk(
    chunk: &Chunk,
    fields: &FieldSpec,
    schema: &CollectionSchema,
    backend: &Backend,
    call_timeout: Duration,
) -> BackendResponse {
    let prompt = format_extract_prompt(fields, &chunk.text);
    debug!(chunk = chunk.index, tokens = chunk.token_count(), "Chunk attempted");

    let outcome = match tokio::time::timeout(call_timeout, backend.generate(&prompt, schema)).await
    {
        Ok(Ok(text)) if text.trim().is_empty() => Err(BackendError::Empty),
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout(call_timeout)),
    };

    match &outcome {
        Ok(text) => info!(chunk = chunk.index, bytes = text.len(), "Chunk succeeded"),
        Err(e) => warn!(chunk = chunk.index, error = %e, "Chunk failed, skipping"),
    }

    BackendResponse {
        chunk: chunk.index,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::chunk::TokenChunker;
    use crate::testing::{CharTokenizer, MockBackend, MockReply};
    use crate::types::schema::build_schema;
    use std::sync::Arc;

    fn setup(text: &str, max: usize) -> (Vec<Chunk>, FieldSpec, CollectionSchema) {
        let chunks = TokenChunker::new(Arc::new(CharTokenizer), max)
            .unwrap()
            .chunk(text);
        let fields = FieldSpec::new(["name"]).unwrap();
        let (_, schema) = build_schema(&fields);
        (chunks, fields, schema)
    }

    #[tokio::test]
    async fn test_one_response_per_chunk_in_order() {
        let (chunks, fields, schema) = setup("aaaabbbbcc", 4);
        let mock = MockBackend::new().reply("r1").reply("r2").reply("r3");

        let responses = extract_chunks(
            &chunks,
            &fields,
            &schema,
            &mock.free_text(),
            &ExtractionConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let texts: Vec<_> = responses.iter().map(|r| r.text().unwrap()).collect();
        assert_eq!(texts, vec!["r1", "r2", "r3"]);
        assert_eq!(
            responses.iter().map(|r| r.chunk).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(mock.calls()[1].prompt.ends_with("bbbb"));
    }

    #[tokio::test]
    async fn test_failures_and_blank_text_are_isolated() {
        let (chunks, fields, schema) = setup("aaaabbbbcc", 4);
        let mock = MockBackend::new().fail("quota").reply("  \n").reply("ok");

        let responses = extract_chunks(
            &chunks,
            &fields,
            &schema,
            &mock.schema_constrained(),
            &ExtractionConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(responses[0].outcome, Err(BackendError::Rejected(_))));
        assert!(matches!(responses[1].outcome, Err(BackendError::Empty)));
        assert_eq!(responses[2].text(), Some("ok"));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_times_out() {
        let (chunks, fields, schema) = setup("aaaabbbb", 4);
        let mock = MockBackend::new()
            .when_prompt_contains("aaaa", MockReply::Hang)
            .reply("ok");
        let config = ExtractionConfig::default().with_call_timeout(Duration::from_secs(5));

        let responses = extract_chunks(
            &chunks,
            &fields,
            &schema,
            &mock.free_text(),
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(matches!(
            responses[0].outcome,
            Err(BackendError::Timeout(d)) if d == Duration::from_secs(5)
        ));
        assert_eq!(responses[1].text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (chunks, fields, schema) = setup("aaaa", 4);
        let mock = MockBackend::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extract_chunks(
            &chunks,
            &fields,
            &schema,
            &mock.free_text(),
            &ExtractionConfig::default(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractionError::Cancelled));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_drops_in_flight_calls() {
        let (chunks, fields, schema) = setup("aaaabbbb", 4);
        let mock = MockBackend::new().hang();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = extract_chunks(
            &chunks,
            &fields,
            &schema,
            &mock.free_text(),
            &ExtractionConfig::default(),
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExtractionError::Cancelled));
        assert_eq!(mock.call_count(), 1);
    }
}
