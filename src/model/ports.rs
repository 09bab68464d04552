use async_trait::async_trait;

use crate::model::error::ModelError;

/// One structured-generation call. Budgets are per request: the proposal flow
/// runs each stage under its own token/temperature/timeout limits, federated
/// from the prose reasoning surface rather than shared with it.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub request_id: String,
    pub stage: &'static str,
    pub prompt: String,
    pub max_output_tokens: u64,
    pub temperature_milli: u16,
    pub timeout_ms: u64,
}

/// What comes back from the black box: raw text plus call metadata. The gate
/// never interprets the text locally.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub output_text: Option<String>,
    pub model_id: String,
    pub elapsed_ms: u64,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[async_trait]
pub trait ModelPort: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
