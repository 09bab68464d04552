use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;

use thalamus::{
    envelope::{Envelope, EnvelopeMeta},
    provenance,
    reduction::{
        ReducerPort, ReductionClient,
        error::{ReductionError, transport_failure},
        types::{FallbackReason, ReductionOutcome},
    },
};

struct StaticReducer {
    response: serde_json::Value,
}

#[async_trait]
impl ReducerPort for StaticReducer {
    async fn submit(
        &self,
        _request: &thalamus::reduction::ReduceRequest,
    ) -> Result<serde_json::Value, ReductionError> {
        Ok(self.response.clone())
    }
}

struct FailingReducer;

#[async_trait]
impl ReducerPort for FailingReducer {
    async fn submit(
        &self,
        _request: &thalamus::reduction::ReduceRequest,
    ) -> Result<serde_json::Value, ReductionError> {
        Err(transport_failure("connection refused"))
    }
}

struct HangingReducer;

#[async_trait]
impl ReducerPort for HangingReducer {
    async fn submit(
        &self,
        _request: &thalamus::reduction::ReduceRequest,
    ) -> Result<serde_json::Value, ReductionError> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(serde_json::json!({}))
    }
}

fn envelope() -> Envelope {
    Envelope::build(
        "I should mine coal",
        EnvelopeMeta {
            model_id: Some("m1".to_string()),
            prompt_digest: None,
        },
    )
}

#[tokio::test]
async fn processed_response_passes_fields_through() {
    let response = serde_json::json!({
        "intent_family": "gathering",
        "intent_type": "mine",
        "committed_goal_prop_id": "goal:coal",
        "is_executable": true,
        "grounding": {"passed": true, "reason": "coal within reach"},
    });
    let client = ReductionClient::new(Arc::new(StaticReducer { response }));

    let envelope = envelope();
    let outcome = client.reduce(&envelope, Duration::from_millis(200)).await;

    match outcome {
        ReductionOutcome::Processed {
            intent,
            request_hash,
            output_hash,
            ..
        } => {
            assert!(intent.executable);
            assert_eq!(intent.intent_family, "gathering");
            assert_eq!(intent.committed_goal_prop_id.as_deref(), Some("goal:coal"));
            assert_eq!(request_hash, provenance::request_hash(&envelope));
            assert_ne!(output_hash, provenance::output_hash(None));
        }
        other => panic!("expected processed outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_is_executable_is_treated_as_false() {
    let response = serde_json::json!({
        "intent_family": "gathering",
        "intent_type": "mine",
    });
    let client = ReductionClient::new(Arc::new(StaticReducer { response }));

    let outcome = client.reduce(&envelope(), Duration::from_millis(200)).await;
    assert!(outcome.processed());
    assert!(!outcome.executable());
}

#[tokio::test]
async fn structurally_invalid_response_falls_back_malformed() {
    let response = serde_json::json!({"weird": "shape"});
    let client = ReductionClient::new(Arc::new(StaticReducer { response }));

    let outcome = client.reduce(&envelope(), Duration::from_millis(200)).await;
    assert!(!outcome.processed());
    assert_eq!(
        outcome.fallback_reason(),
        Some(FallbackReason::MalformedResponse)
    );
}

#[tokio::test]
async fn transport_failure_falls_back_closed() {
    let client = ReductionClient::new(Arc::new(FailingReducer));

    let outcome = client.reduce(&envelope(), Duration::from_millis(200)).await;
    assert!(!outcome.processed());
    assert!(!outcome.executable());
    assert_eq!(
        outcome.fallback_reason(),
        Some(FallbackReason::TransportError)
    );
}

#[tokio::test]
async fn timeout_settles_to_fallback_deterministically() {
    let client = ReductionClient::new(Arc::new(HangingReducer));

    let outcome = client.reduce(&envelope(), Duration::from_millis(20)).await;
    match outcome {
        ReductionOutcome::Fallback {
            envelope_id,
            reason,
        } => {
            assert_eq!(envelope_id, envelope().envelope_id);
            assert_eq!(reason, FallbackReason::Timeout);
        }
        other => panic!("expected fallback outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn noop_reducer_always_fails_closed() {
    let client = ReductionClient::new(Arc::new(thalamus::reduction::NoopReducer));

    let outcome = client.reduce(&envelope(), Duration::from_millis(200)).await;
    assert!(!outcome.processed());
    assert!(!outcome.executable());
}

#[test]
fn null_and_empty_outputs_hash_differently() {
    assert_ne!(
        provenance::output_hash(None),
        provenance::output_hash(Some(""))
    );
}
