use async_trait::async_trait;

use crate::reduction::{
    error::{ReductionError, transport_failure},
    ports::ReducerPort,
    types::ReduceRequest,
};

/// Placeholder reducer for wiring without an authority attached. Every call
/// reports transport failure, so derived eligibility stays false.
#[derive(Default)]
pub struct NoopReducer;

#[async_trait]
impl ReducerPort for NoopReducer {
    async fn submit(&self, _request: &ReduceRequest) -> Result<serde_json::Value, ReductionError> {
        Err(transport_failure("no reducer attached"))
    }
}
