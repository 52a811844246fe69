//! Schema-Driven Text-to-Table Extraction Library
//!
//! Turns page text and a list of field names into a table of records by
//! delegating to an interchangeable LLM backend. Text longer than the
//! backend's input budget is cut into token-bounded chunks, each chunk is
//! extracted on its own, and the results are merged back together.
//!
//! # Design Philosophy
//!
//! - The caller's field list is the schema: one string column per field
//! - Backends are not trusted to return valid JSON
//! - A failed chunk costs its rows, never the run
//! - "No data found" is an empty table, not an error
//!
//! # Usage
//!
//! ```rust,ignore
//! use extraction::{BackendConfig, BackendKind, ExtractionConfig, Extractor};
//!
//! let backends = BackendConfig::from_env()?;
//! let extractor = Extractor::from_config(&backends, BackendKind::GeminiFlash, ExtractionConfig::default())?;
//!
//! let result = extractor.extract(&markdown, ["title", "price", "location"]).await?;
//! result.table.save_csv("listings.csv")?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (backends, tokenizer, fetcher)
//! - [`types`] - Field specs, schemas, tables and run configuration
//! - [`pipeline`] - Chunking, orchestration and merging
//! - [`backends`] - OpenAI and Gemini adapters plus their configuration
//! - [`ingestors`] - HTTP fetcher and HTML normalizer
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod backends;
pub mod error;
pub mod ingestors;
pub mod pipeline;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{BackendError, ExtractionError, FetchError, Result};
pub use traits::{
    backend::{FreeTextGenerator, SchemaGenerator},
    fetcher::{Normalizer, PageFetcher},
    tokenizer::{Token, Tokenizer},
};
pub use types::{
    config::{ExtractionConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_TOKENS_PER_CHUNK},
    schema::{build_schema, CollectionSchema, FieldDescriptor, FieldSpec, FieldType, RecordSchema, LISTINGS_KEY},
    table::{timestamped_file_name, ExtractionTable},
};

// Re-export backends
pub use backends::{Backend, BackendConfig, BackendKind};

// Re-export pipeline components
pub use pipeline::{
    // Chunking
    chunk_text, BpeTokenizer, Chunk, TokenChunker,
    // Orchestration
    extract_chunks, format_extract_prompt, BackendResponse, SYSTEM_MESSAGE,
    // Merging
    merge, merge_responses, ChunkFailure, MergeStats,
    // Entry points
    ExtractionReport, ExtractionResult, Extractor, Scraper,
};

// Re-export ingestors
pub use ingestors::{HttpFetcher, MarkdownNormalizer};

// Re-export testing utilities
pub use testing::{CharTokenizer, MockBackend, MockFetcher, MockReply};
