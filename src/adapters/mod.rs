//! Adapter interfaces for the completion-streaming endpoint.
//!
//! An adapter turns an analysis request into a raw byte-chunk stream of
//! newline-delimited `data:` records. Everything about authentication and
//! transport stays behind this seam.

pub mod deepseek;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SubjectArea;

// Re-export the DeepSeek adapter
pub use deepseek::DeepSeekClient;

/// Raw upstream body, chunk by chunk
pub type ChunkStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// The outbound analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub case_content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_area: Option<SubjectArea>,
}

/// Request-level failures. None of these are recoverable by the assembler.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("API key is not configured (set DEEPSEEK_API_KEY)")]
    MissingApiKey,

    #[error("API key has an unexpected format (expected a key starting with \"sk-\")")]
    InvalidApiKey,

    #[error("request could not be sent: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream interrupted: {0}")]
    Stream(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// A completion-streaming endpoint
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Send the request and return the response body as it arrives
    async fn stream(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError>;
}
