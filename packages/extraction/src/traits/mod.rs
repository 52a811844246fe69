//! Core trait abstractions for the extraction library.
//!
//! These traits define the seams where applications plug in generation
//! backends, tokenizers, and page acquisition.

pub mod backend;
pub mod fetcher;
pub mod tokenizer;
