//! Merging chunk responses into one table.
//!
//! Backends are not trusted to return valid JSON. Every response is parsed on
//! its own; one that fails to parse or lacks a `listings` array contributes no
//! rows and the rest still merge. Records are normalized to exactly the
//! requested columns.

use openai_client::strip_code_blocks;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::pipeline::orchestrate::BackendResponse;
use crate::types::schema::{FieldSpec, LISTINGS_KEY};
use crate::types::table::ExtractionTable;

/// Why a chunk contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkFailure {
    /// The backend call failed, timed out or returned no text
    Call { chunk: usize, reason: String },

    /// The response was not valid JSON
    Parse { chunk: usize, reason: String },
}

impl ChunkFailure {
    pub fn chunk(&self) -> usize {
        match self {
            Self::Call { chunk, .. } | Self::Parse { chunk, .. } => *chunk,
        }
    }
}

/// Counters collected while merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Responses that parsed as JSON
    pub parsed: usize,

    /// Parsed responses without a `listings` array
    pub missing_listings: usize,

    /// Array items that were not objects
    pub skipped_items: usize,

    /// Rows appended to the table
    pub records: usize,

    pub failures: Vec<ChunkFailure>,
}

impl MergeStats {
    pub fn call_failures(&self) -> usize {
        self.count(|f| matches!(f, ChunkFailure::Call { .. }))
    }

    pub fn parse_failures(&self) -> usize {
        self.count(|f| matches!(f, ChunkFailure::Parse { .. }))
    }

    fn count(&self, pred: impl Fn(&ChunkFailure) -> bool) -> usize {
        self.failures.iter().filter(|f| pred(f)).count()
    }
}

/// Merge responses into a table with one column per field.
pub fn merge(responses: &[BackendResponse], fields: &FieldSpec) -> ExtractionTable {
    merge_responses(responses, fields).0
}

/// [`merge`], also returning what happened to each response.
pub fn merge_responses(
    responses: &[BackendResponse],
    fields: &FieldSpec,
) -> (ExtractionTable, MergeStats) {
    let mut table = ExtractionTable::empty(fields);
    let mut stats = MergeStats::default();

    for response in responses {
        let text = match &response.outcome {
            Ok(text) => text,
            Err(e) => {
                stats.failures.push(ChunkFailure::Call {
                    chunk: response.chunk,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let value: Value = match serde_json::from_str(strip_code_blocks(text)) {
            Ok(value) => value,
            Err(e) => {
                warn!(chunk = response.chunk, error = %e, "Response is not valid JSON, skipping chunk");
                stats.failures.push(ChunkFailure::Parse {
                    chunk: response.chunk,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        stats.parsed += 1;

        let Some(items) = value.get(LISTINGS_KEY).and_then(Value::as_array) else {
            debug!(chunk = response.chunk, "No listings array in response");
            stats.missing_listings += 1;
            continue;
        };

        for item in items {
            match item.as_object() {
                Some(record) => {
                    table.push_row(normalize_record(record, fields));
                    stats.records += 1;
                }
                None => stats.skipped_items += 1,
            }
        }
    }

    debug!(
        responses = responses.len(),
        records = stats.records,
        call_failures = stats.call_failures(),
        parse_failures = stats.parse_failures(),
        "Responses merged"
    );

    (table, stats)
}

/// One cell per field in field order.
fn normalize_record(record: &Map<String, Value>, fields: &FieldSpec) -> Vec<String> {
    fields
        .iter()
        .map(|name| match record.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::time::Duration;

    fn fields(names: &[&str]) -> FieldSpec {
        FieldSpec::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn test_concatenates_in_response_order() {
        let f = fields(&["name", "price"]);
        let responses = vec![
            BackendResponse::ok(1, r#"{"listings":[{"name":"A","price":"1"}]}"#),
            BackendResponse::ok(2, "not json"),
            BackendResponse::ok(3, r#"{"listings":[{"name":"B","price":"2"},{"name":"C","price":"3"}]}"#),
        ];

        let (table, stats) = merge_responses(&responses, &f);

        assert_eq!(table.columns(), ["name", "price"]);
        assert_eq!(table.column("name").unwrap(), vec!["A", "B", "C"]);
        assert_eq!(stats.parse_failures(), 1);
        assert_eq!(stats.failures[0].chunk(), 2);
        assert_eq!(stats.records, 3);
    }

    #[test]
    fn test_records_normalized_to_columns() {
        let f = fields(&["name", "price"]);
        let responses = vec![BackendResponse::ok(
            1,
            r#"{"listings":[{"name":"A","color":"red"},{"price":12.5,"name":null},{"name":true,"price":[1]}]}"#,
        )];

        let table = merge(&responses, &f);

        assert_eq!(
            table.rows(),
            [
                vec!["A".to_string(), String::new()],
                vec![String::new(), "12.5".to_string()],
                vec!["true".to_string(), "[1]".to_string()],
            ]
        );
    }

    #[test]
    fn test_missing_or_malformed_listings() {
        let f = fields(&["name"]);
        let responses = vec![
            BackendResponse::ok(1, r#"{"items":[{"name":"A"}]}"#),
            BackendResponse::ok(2, r#"{"listings":{"name":"B"}}"#),
            BackendResponse::ok(3, r#"[{"name":"C"}]"#),
            BackendResponse::ok(4, r#"{"listings":["D",{"name":"E"},7]}"#),
        ];

        let (table, stats) = merge_responses(&responses, &f);

        assert_eq!(table.column("name").unwrap(), vec!["E"]);
        assert_eq!(stats.parsed, 4);
        assert_eq!(stats.missing_listings, 3);
        assert_eq!(stats.skipped_items, 2);
        assert!(stats.failures.is_empty());
    }

    #[test]
    fn test_code_fenced_json() {
        let f = fields(&["name"]);
        let responses = vec![
            BackendResponse::ok(1, "```json\n{\"listings\":[{\"name\":\"A\"}]}\n```"),
            BackendResponse::ok(2, "```\n{\"listings\":[{\"name\":\"B\"}]}\n```"),
        ];

        assert_eq!(merge(&responses, &f).column("name").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_call_failures_recorded() {
        let f = fields(&["name"]);
        let responses = vec![
            BackendResponse::failed(1, BackendError::Timeout(Duration::from_secs(1))),
            BackendResponse::failed(2, BackendError::Empty),
        ];

        let (table, stats) = merge_responses(&responses, &f);

        assert!(table.is_empty());
        assert_eq!(table.columns(), ["name"]);
        assert_eq!(stats.call_failures(), 2);
    }

    #[test]
    fn test_no_responses_gives_empty_table_with_headers() {
        let f = fields(&["a", "b", "c"]);
        let table = merge(&[], &f);
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["a", "b", "c"]);
    }
}
