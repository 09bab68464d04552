use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, EnvelopeId};

/// Wire request sent to the reducer. Fields mirror the envelope's stable
/// subset; nothing is added locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceRequest {
    pub envelope_id: EnvelopeId,
    pub sanitized_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_digest: Option<String>,
}

impl ReduceRequest {
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            envelope_id: envelope.envelope_id.clone(),
            sanitized_text: envelope.sanitized_text.clone(),
            model_id: envelope.model_id.clone(),
            prompt_digest: envelope.prompt_digest.clone(),
        }
    }
}

/// Grounding sub-result as the reducer reports it. Relayed opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingResult {
    pub passed: bool,
    pub reason: String,
}

/// Wire response from the reducer. A missing `is_executable` deserializes to
/// false; the gate never upgrades an absent claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducerResponse {
    pub intent_family: String,
    pub intent_type: String,
    #[serde(default)]
    pub committed_goal_prop_id: Option<String>,
    #[serde(default)]
    pub is_executable: bool,
    #[serde(default)]
    pub grounding: Option<GroundingResult>,
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Structured result of a processed reduction, with the authority's fields
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducedIntent {
    pub intent_family: String,
    pub intent_type: String,
    #[serde(default)]
    pub committed_goal_prop_id: Option<String>,
    pub executable: bool,
    #[serde(default)]
    pub grounding: Option<GroundingResult>,
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl From<ReducerResponse> for ReducedIntent {
    fn from(response: ReducerResponse) -> Self {
        Self {
            intent_family: response.intent_family,
            intent_type: response.intent_type,
            committed_goal_prop_id: response.committed_goal_prop_id,
            executable: response.is_executable,
            grounding: response.grounding,
            block_reason: response.block_reason,
        }
    }
}

/// Closed set of reasons a reduction settled without the authority running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Unavailable,
    Timeout,
    TransportError,
    MalformedResponse,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::Unavailable => "unavailable",
            FallbackReason::Timeout => "timeout",
            FallbackReason::TransportError => "transport_error",
            FallbackReason::MalformedResponse => "malformed_response",
        }
    }
}

/// Outcome of one reduction round trip. Exactly one of these is produced per
/// call. A fallback carries no semantic claims: its effective `executable`
/// is always false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReductionOutcome {
    Processed {
        intent: ReducedIntent,
        request_hash: String,
        output_hash: String,
        elapsed_ms: u64,
    },
    Fallback {
        envelope_id: EnvelopeId,
        reason: FallbackReason,
    },
}

impl ReductionOutcome {
    pub fn processed(&self) -> bool {
        matches!(self, ReductionOutcome::Processed { .. })
    }

    pub fn executable(&self) -> bool {
        match self {
            ReductionOutcome::Processed { intent, .. } => intent.executable,
            ReductionOutcome::Fallback { .. } => false,
        }
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            ReductionOutcome::Processed { .. } => None,
            ReductionOutcome::Fallback { reason, .. } => Some(*reason),
        }
    }
}
