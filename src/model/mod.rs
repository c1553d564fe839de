//! Model inference abstraction.

mod ollama;

pub use ollama::{OllamaClient, DEFAULT_HOST};

use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for chunk-transforming model backends.
///
/// Implementations issue a single inference call per invocation; retry is the
/// pipeline's responsibility. Cancellation must be observed both before and
/// while a call is in flight.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Apply `prompt` to `chunk_text` and return the transformed text.
    ///
    /// Fails with `Cancelled` when the token is raised, or `ModelUnavailable`
    /// for connectivity, timeout, and protocol failures. The returned text is
    /// not post-processed.
    async fn transform(
        &self,
        chunk_text: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}
