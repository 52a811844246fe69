//! Generation backend traits.
//!
//! Backends come in two capability flavours. A free-text backend only sees a
//! prompt and a system instruction and answers with whatever text the model
//! produces. A schema-constrained backend is handed the collection schema and
//! asked to answer with JSON matching it. Neither is trusted to return valid
//! JSON; the merger checks.

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::types::schema::CollectionSchema;

/// A backend that takes a prompt plus system instruction and returns free text.
#[async_trait]
pub trait FreeTextGenerator: Send + Sync {
    /// Generate a completion for `prompt` under `system_instruction`.
    async fn generate(&self, prompt: &str, system_instruction: &str) -> BackendResult<String>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// A backend that is told the exact output shape in-band.
#[async_trait]
pub trait SchemaGenerator: Send + Sync {
    /// Generate JSON text for `prompt` that should conform to `schema`.
    ///
    /// Conformance is best effort on the backend's side.
    async fn generate(&self, prompt: &str, schema: &CollectionSchema) -> BackendResult<String>;

    /// Name used in logs.
    fn name(&self) -> &str;
}
