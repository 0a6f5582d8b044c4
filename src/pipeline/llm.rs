//! VLM interaction: build the vision message and call the provider.
//!
//! This module turns a validated bill image into exactly one model call and
//! returns the raw reply text. All prompt engineering lives in
//! [`crate::prompts`]; all reply parsing lives in
//! [`crate::pipeline::normalize`].
//!
//! There is deliberately no retry loop here: a failed call is reported to the
//! client as-is and the client decides whether to resubmit the photo.

use crate::error::ModelError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// The external generation service, seen from the gateway.
///
/// One call, one reply. Implementations must not retry.
#[async_trait]
pub trait BillModel: Send + Sync {
    /// Send `prompt` plus the inline image and return the model's raw text.
    async fn generate(&self, prompt: &str, image: ImageData) -> Result<String, ModelError>;
}

/// [`BillModel`] backed by an `edgequake-llm` provider (Gemini by default).
pub struct LlmBillModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmBillModel {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            options: build_options(temperature, max_tokens),
        }
    }
}

#[async_trait]
impl BillModel for LlmBillModel {
    /// ## Message Layout
    ///
    /// A single user message carrying the extraction prompt as text and the
    /// bill photo as an attached image, so the instructions and the image are
    /// read as one turn.
    async fn generate(&self, prompt: &str, image: ImageData) -> Result<String, ModelError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];

        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "{} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(e) => {
                let err_msg = format!("{}", e);
                warn!("Model call failed after {:?}: {}", start.elapsed(), err_msg);
                Err(ModelError::new(err_msg))
            }
        }
    }
}

/// Build `CompletionOptions` from the gateway config values.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_sets_sampling() {
        let opts = build_options(0.1, 4096);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
