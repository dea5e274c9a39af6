//! DeepSeek chat-completions adapter.
//!
//! Sends the case to `{base_url}/chat/completions` with `stream: true` and
//! hands back the raw SSE body. Decoding is left to the assembler.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::config::ProviderSettings;

use super::prompt::{user_prompt, SYSTEM_PROMPT};
use super::{AnalysisRequest, ChunkStream, CompletionSource, TransportError};

/// Required prefix of a DeepSeek API key
pub const API_KEY_PREFIX: &str = "sk-";

/// Check that a key is present and looks like a DeepSeek key
pub fn check_api_key(key: Option<&str>) -> Result<&str, TransportError> {
    let key = key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(TransportError::MissingApiKey)?;
    if !key.starts_with(API_KEY_PREFIX) {
        return Err(TransportError::InvalidApiKey);
    }
    Ok(key)
}

/// Streaming client for the DeepSeek reasoning model
pub struct DeepSeekClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
}

impl DeepSeekClient {
    /// Create a client. Fails if the key is missing or malformed.
    pub fn new(api_key: Option<&str>, settings: &ProviderSettings) -> Result<Self, TransportError> {
        let api_key = check_api_key(api_key)?.to_string();
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    /// Completions endpoint URL
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the JSON request body
    pub fn request_body(&self, request: &AnalysisRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(&request.case_content, request.subject_area) },
            ],
            "stream": true,
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl CompletionSource for DeepSeekClient {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn stream(&self, request: &AnalysisRequest) -> Result<ChunkStream, TransportError> {
        let url = self.endpoint();
        tracing::info!(model = %self.model, %url, chars = request.case_content.chars().count(), "Sending analysis request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Upstream rejected analysis request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Upstream accepted request, streaming response");
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Stream(e.to_string())));
        Ok(body.boxed())
    }
}
