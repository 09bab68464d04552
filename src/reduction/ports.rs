use async_trait::async_trait;

use crate::reduction::{error::ReductionError, types::ReduceRequest};

/// Transport seam to the external semantic authority. Adapters return the raw
/// JSON response body; shape validation belongs to the client, retry policy
/// (if any) belongs to the caller above it.
#[async_trait]
pub trait ReducerPort: Send + Sync {
    async fn submit(&self, request: &ReduceRequest) -> Result<serde_json::Value, ReductionError>;
}
