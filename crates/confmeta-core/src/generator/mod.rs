//! Text-generation backends that turn a prompt into completion text.

#[cfg(test)]
pub(crate) mod mock;
pub mod ollama;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

pub use ollama::OllamaGenerator;

/// Callback receiving completion fragments as they stream in.
pub type ChunkSink<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Failure to obtain a completion. Never cached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed stream fragment: {0}")]
    Fragment(String),
    #[error("service error: {0}")]
    Service(String),
}

/// A backend that completes a prompt, optionally streaming fragments to a
/// sink while it runs. The returned text is the full concatenated completion.
pub trait TextGenerator: Send + Sync {
    /// Model or backend name, for logs.
    fn name(&self) -> &str;

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_chunk: Option<&'a ChunkSink<'a>>,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>>;
}
