//! Tokenizer abstraction for chunk accounting.

/// Token id.
pub type Token = u32;

/// Encodes text into the token ids a backend bills and limits by.
///
/// `decode` works on arbitrary slices of an encoding; a slice that cuts a
/// multi-byte character in half decodes with U+FFFD in its place.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<Token>;

    fn decode(&self, tokens: &[Token]) -> String;

    /// Name used in logs.
    fn name(&self) -> &str;
}
