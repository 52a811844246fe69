//! Token-bounded chunking.
//!
//! Backends bill and limit input by tokens, so text is cut on token
//! boundaries: encode once, split the id sequence into runs of at most
//! `max_tokens`, decode each run on its own. Chunks never overlap.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::traits::tokenizer::{Token, Tokenizer};

/// One 1-indexed, token-bounded slice of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the source, starting at 1
    pub index: usize,

    /// Token ids of this slice
    pub tokens: Vec<Token>,

    /// Decoded text of this slice
    pub text: String,
}

impl Chunk {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Splits text into chunks of at most `max_tokens` tokens.
#[derive(Clone)]
pub struct TokenChunker {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
}

impl TokenChunker {
    /// Rejects a zero budget instead of clamping it.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(ExtractionError::input(
                "max_tokens_per_chunk must be a positive integer",
            ));
        }
        Ok(Self {
            tokenizer,
            max_tokens,
        })
    }

    /// Empty text yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        let tokens = self.tokenizer.encode(text);
        let chunks: Vec<Chunk> = tokens
            .chunks(self.max_tokens)
            .enumerate()
            .map(|(i, group)| Chunk {
                index: i + 1,
                tokens: group.to_vec(),
                text: self.tokenizer.decode(group),
            })
            .collect();

        debug!(
            tokenizer = self.tokenizer.name(),
            total_tokens = tokens.len(),
            max_tokens = self.max_tokens,
            chunks = chunks.len(),
            "Text chunked"
        );

        chunks
    }
}

/// One-shot form of [`TokenChunker::chunk`].
pub fn chunk_text(
    tokenizer: Arc<dyn Tokenizer>,
    text: &str,
    max_tokens_per_chunk: usize,
) -> Result<Vec<Chunk>> {
    Ok(TokenChunker::new(tokenizer, max_tokens_per_chunk)?.chunk(text))
}

/// Byte-pair tokenizer backed by `tiktoken-rs`.
pub struct BpeTokenizer {
    bpe: CoreBPE,
    name: String,
}

impl BpeTokenizer {
    /// The `cl100k_base` encoding used by gpt-4 and gpt-3.5.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ExtractionError::Config(format!("failed to load cl100k_base: {}", e)))?;
        Ok(Self {
            bpe,
            name: "cl100k_base".to_string(),
        })
    }

}

impl Tokenizer for BpeTokenizer {
    fn encode(&self, text: &str) -> Vec<Token> {
        self.bpe.encode_ordinary(text)
    }

    /// Ids must come from [`Tokenizer::encode`] on the same encoding. A
    /// character split across chunks decodes to U+FFFD on each side.
    fn decode(&self, tokens: &[Token]) -> String {
        let bytes: Vec<u8> = self
            .bpe
            ._decode_native_and_split(tokens.to_vec())
            .flatten()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CharTokenizer;

    fn char_chunker(max: usize) -> TokenChunker {
        TokenChunker::new(Arc::new(CharTokenizer), max).unwrap()
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = TokenChunker::new(Arc::new(CharTokenizer), 0).err().unwrap();
        assert!(matches!(err, ExtractionError::Input { .. }));
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        for max in [1, 7, 3000] {
            assert!(char_chunker(max).chunk("").is_empty());
        }
    }

    #[test]
    fn test_chunk_count_is_ceiling_and_last_is_short() {
        let chunks = char_chunker(4).chunk("abcdefghij");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "abcd");
        assert_eq!(chunks[1].text, "efgh");
        assert_eq!(chunks[2].text, "ij");
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_chunks_partition_token_sequence() {
        let text = "The quick brown fox jumps over the lazy dog";
        let tokenizer = CharTokenizer;
        let expected = tokenizer.encode(text);

        for max in 1..=expected.len() + 2 {
            let chunks = char_chunker(max).chunk(text);
            assert_eq!(chunks.len(), expected.len().div_ceil(max));
            assert!(chunks.iter().all(|c| c.token_count() <= max));

            let rejoined: Vec<Token> = chunks.iter().flat_map(|c| c.tokens.clone()).collect();
            assert_eq!(rejoined, expected);
        }
    }

    #[test]
    fn test_cl100k_round_trip() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(BpeTokenizer::cl100k().unwrap());
        let text = "Apartment listings:\n- 2BR in Midtown, $2,400/mo\n- Studio near the park, $1,150/mo\n".repeat(20);
        let expected = tokenizer.encode(&text);

        let chunks = chunk_text(tokenizer.clone(), &text, 50).unwrap();

        assert_eq!(chunks.len(), expected.len().div_ceil(50));
        let rejoined: Vec<Token> = chunks.iter().flat_map(|c| c.tokens.clone()).collect();
        assert_eq!(rejoined, expected);
        let text_rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text_rejoined, text);
    }

    #[test]
    fn test_cl100k_split_multibyte_decodes_lossily() {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(BpeTokenizer::cl100k().unwrap());
        let text = "価格は三千円です。🏠🏠🏠";
        let expected = tokenizer.encode(text);

        let chunks = chunk_text(tokenizer, text, 1).unwrap();

        assert_eq!(chunks.len(), expected.len());
        let rejoined: Vec<Token> = chunks.iter().flat_map(|c| c.tokens.clone()).collect();
        assert_eq!(rejoined, expected);
        assert!(chunks.iter().all(|c| !c.text.is_empty()));

        // Each chunk is either whole characters from the source or carries
        // replacement characters for the bytes of a split one.
        let mut split = 0;
        for chunk in &chunks {
            if chunk.text.contains('\u{FFFD}') {
                split += 1;
            } else {
                assert!(text.contains(chunk.text.as_str()), "{:?}", chunk.text);
            }
        }
        assert!(split > 0);

        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_ne!(joined, text);
        assert_eq!(joined.replace('\u{FFFD}', "").chars().filter(|c| !text.contains(*c)).count(), 0);
    }

    #[test]
    fn test_cl100k_whole_characters_decode_exactly() {
        let tokenizer = BpeTokenizer::cl100k().unwrap();
        let text = "価格は三千円です。🏠";
        let tokens = tokenizer.encode(text);

        assert_eq!(tokenizer.decode(&tokens), text);
        assert_eq!(tokenizer.decode(&[]), "");
    }

    proptest::proptest! {
        #[test]
        fn prop_chunks_partition_any_text(text in "\\PC{0,200}", max in 1usize..64) {
            let expected = CharTokenizer.encode(&text);
            let chunks = char_chunker(max).chunk(&text);

            proptest::prop_assert_eq!(chunks.len(), expected.len().div_ceil(max));
            let rejoined: Vec<Token> = chunks.iter().flat_map(|c| c.tokens.clone()).collect();
            proptest::prop_assert_eq!(rejoined, expected);
            let text_rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
            proptest::prop_assert_eq!(text_rejoined, text);
        }
    }
}
