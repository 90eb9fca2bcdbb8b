//! LLM provider abstraction
//!
//! The completion collaborator: turns a conversation history into one
//! assistant reply, and probes whether a credential is usable.

mod config;
mod error;
mod openai;
mod types;

pub use config::{LlmConfig, PROBE_MAX_TOKENS};
pub(crate) use config::parse_or;
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Display name of the upstream provider
pub const PROVIDER_NAME: &str = "OpenAI";

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request on behalf of `api_key`
    async fn complete(&self, api_key: &str, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, api_key: &str, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(api_key, request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    turns = request.messages.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Check a candidate credential with one minimal completion.
///
/// Any successful response counts as verified. Blank keys are refused
/// without touching the network.
pub async fn verify_api_key(service: &dyn LlmService, api_key: &str) -> Result<(), LlmError> {
    if api_key.trim().is_empty() {
        return Err(LlmError::auth("API key is empty"));
    }
    let probe = LlmRequest::new(vec![LlmMessage::user("Hello")]).with_max_tokens(PROBE_MAX_TOKENS);
    service.complete(api_key, &probe).await.map(|_| ())
}
