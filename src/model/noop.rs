use async_trait::async_trait;

use crate::model::{
    error::{ModelError, backend_failure},
    ports::{ModelPort, ModelRequest, ModelResponse},
};

/// Placeholder model for wiring without a backend attached.
#[derive(Default)]
pub struct NoopModel;

#[async_trait]
impl ModelPort for NoopModel {
    async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
        Err(backend_failure("no model backend attached"))
    }
}
