use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};

use crate::reduction::{
    error::{ReductionError, contract_failure, transport_failure},
    ports::ReducerPort,
    types::ReduceRequest,
};

/// JSON-over-HTTP adapter for a remote reducer. The adapter does transport
/// only: the response body comes back as raw JSON for the client to validate.
pub struct HttpReducer {
    client: Client,
    endpoint: String,
}

impl HttpReducer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client must build"),
            endpoint: endpoint.into(),
        }
    }

    fn reduce_url(&self) -> String {
        format!("{}/reduce", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReducerPort for HttpReducer {
    async fn submit(&self, request: &ReduceRequest) -> Result<serde_json::Value, ReductionError> {
        let response = self
            .client
            .post(self.reduce_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-envelope-id", request.envelope_id.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() {
                    transport_failure(format!("reducer unreachable: {err}"))
                } else {
                    transport_failure(format!("reducer request failed: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport_failure(format!(
                "reducer returned status {status}"
            )));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| contract_failure(format!("reducer body is not JSON: {err}")))
    }
}
