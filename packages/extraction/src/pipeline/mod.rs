//! Extraction pipeline - the core of the library.
//!
//! Text flows through:
//! - Chunking on token boundaries
//! - One backend call per chunk, failures isolated per chunk
//! - Merging responses into a table with exactly the requested columns

pub mod chunk;
pub mod extractor;
pub mod merge;
pub mod orchestrate;
pub mod prompts;
pub mod scrape;

pub use chunk::{chunk_text, BpeTokenizer, Chunk, TokenChunker};
pub use extractor::{ExtractionReport, ExtractionResult, Extractor};
pub use merge::{merge, merge_responses, ChunkFailure, MergeStats};
pub use orchestrate::{extract_chunks, BackendResponse};
pub use prompts::{format_extract_prompt, SYSTEM_MESSAGE, USER_MESSAGE};
pub use scrape::Scraper;
