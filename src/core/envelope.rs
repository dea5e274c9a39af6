//! Provider envelope decoding.
//!
//! Maps one raw provider payload to at most one [`ChannelDelta`]. Every
//! assumption about the provider's JSON shape lives here so the assembler
//! never looks inside the envelope.

use serde_json::Value;

use crate::domain::ChannelDelta;

/// Extracts the channel fragment carried by a provider payload
pub trait EnvelopeDecoder: Send + Sync {
    /// Returns `None` when the payload carries no usable fragment
    fn decode(&self, payload: &Value) -> Option<ChannelDelta>;
}

/// OpenAI-compatible chat-completions streaming envelope with a reasoning
/// channel (`choices[0].delta.reasoning_content`) and an answer channel
/// (`choices[0].delta.content`).
///
/// Reasoning wins when a delta carries both. Empty strings count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionsEnvelope;

impl EnvelopeDecoder for ChatCompletionsEnvelope {
    fn decode(&self, payload: &Value) -> Option<ChannelDelta> {
        let delta = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("delta"))?;

        let text_of = |key: &str| {
            delta
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        text_of("reasoning_content")
            .map(ChannelDelta::Reasoning)
            .or_else(|| text_of("content").map(ChannelDelta::Final))
    }
}
