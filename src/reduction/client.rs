use std::{sync::Arc, time::Instant};

use tokio::time::{Duration, timeout};

use crate::{
    envelope::Envelope,
    provenance::{canonicalize_json, output_hash, request_hash},
    reduction::{
        error::{ReductionError, ReductionErrorKind},
        ports::ReducerPort,
        types::{FallbackReason, ReduceRequest, ReducerResponse, ReductionOutcome},
    },
};

/// One round trip to the semantic authority per call. The client settles to
/// exactly one outcome: it never retries, never throws past this boundary,
/// and never post-processes the authority's fields.
#[derive(Clone)]
pub struct ReductionClient {
    port: Arc<dyn ReducerPort>,
}

impl ReductionClient {
    pub fn new(port: Arc<dyn ReducerPort>) -> Self {
        Self { port }
    }

    pub async fn reduce(&self, envelope: &Envelope, timeout_budget: Duration) -> ReductionOutcome {
        let request = ReduceRequest::from_envelope(envelope);
        let started_at = Instant::now();

        let submitted = timeout(timeout_budget, self.port.submit(&request)).await;

        let raw = match submitted {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                tracing::warn!(
                    target: "reduction",
                    envelope_id = %envelope.envelope_id,
                    error_kind = ?err.kind,
                    error = %err,
                    "reduce_transport_failed"
                );
                return self.fallback(envelope, transport_fallback_reason(&err));
            }
            Err(_) => {
                tracing::warn!(
                    target: "reduction",
                    envelope_id = %envelope.envelope_id,
                    timeout_ms = timeout_budget.as_millis() as u64,
                    "reduce_timeout"
                );
                return self.fallback(envelope, FallbackReason::Timeout);
            }
        };

        let output_text = match &raw {
            serde_json::Value::Null => None,
            value => Some(canonicalize_json(value).to_string()),
        };

        let response: ReducerResponse = match serde_json::from_value(raw) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(
                    target: "reduction",
                    envelope_id = %envelope.envelope_id,
                    error = %err,
                    "reduce_malformed_response"
                );
                return self.fallback(envelope, FallbackReason::MalformedResponse);
            }
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        tracing::debug!(
            target: "reduction",
            envelope_id = %envelope.envelope_id,
            intent_family = %response.intent_family,
            intent_type = %response.intent_type,
            is_executable = response.is_executable,
            elapsed_ms = elapsed_ms,
            "reduce_processed"
        );

        ReductionOutcome::Processed {
            intent: response.into(),
            request_hash: request_hash(envelope),
            output_hash: output_hash(output_text.as_deref()),
            elapsed_ms,
        }
    }

    fn fallback(&self, envelope: &Envelope, reason: FallbackReason) -> ReductionOutcome {
        ReductionOutcome::Fallback {
            envelope_id: envelope.envelope_id.clone(),
            reason,
        }
    }
}

fn transport_fallback_reason(err: &ReductionError) -> FallbackReason {
    match err.kind {
        ReductionErrorKind::Transport => FallbackReason::TransportError,
        ReductionErrorKind::Contract => FallbackReason::MalformedResponse,
        ReductionErrorKind::InvalidRequest | ReductionErrorKind::Internal => {
            FallbackReason::Unavailable
        }
    }
}
