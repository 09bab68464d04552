use serde::{Deserialize, Serialize};

use crate::reduction::types::FallbackReason;

pub type TaskId = String;

/// Trigger for a proposal attempt: a task the agent keeps failing at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpasseSignal {
    pub task_id: TaskId,
    pub description: String,
    pub failure_count: u32,
}

/// Stages of the proposal pipeline, in order. Used for provenance and
/// telemetry; control flow walks them sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStage {
    AbstractPlanning,
    DetailedPlanning,
    Refining,
    SpecGenerated,
    GateSubmitted,
}

impl ProposalStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStage::AbstractPlanning => "abstract_planning",
            ProposalStage::DetailedPlanning => "detailed_planning",
            ProposalStage::Refining => "refining",
            ProposalStage::SpecGenerated => "spec_generated",
            ProposalStage::GateSubmitted => "gate_submitted",
        }
    }
}

/// Per-stage call metadata, one record per model invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProvenance {
    pub stage: ProposalStage,
    pub model_id: String,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// A candidate executable specification pending gate approval. The summary is
/// the natural-language justification the gate reduces; the specification is
/// the structured artifact that would be registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCapability {
    pub capability_id: String,
    pub task_id: TaskId,
    pub summary: String,
    pub specification: serde_json::Value,
    pub provenance: Vec<StageProvenance>,
}

/// Closed set of proposal exit tags. One history entry per exit carries
/// exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalOutcomeTag {
    SkippedNoReductionClient,
    AdvisoryOnly,
    Blocked,
    ReductionError,
    Allowed,
    GenerationReturnedNull,
}

impl ProposalOutcomeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalOutcomeTag::SkippedNoReductionClient => "skipped_no_reduction_client",
            ProposalOutcomeTag::AdvisoryOnly => "advisory_only",
            ProposalOutcomeTag::Blocked => "blocked",
            ProposalOutcomeTag::ReductionError => "reduction_error",
            ProposalOutcomeTag::Allowed => "allowed",
            ProposalOutcomeTag::GenerationReturnedNull => "generation_returned_null",
        }
    }
}

/// One attempted proposal, as recorded. Never mutated after insertion;
/// evicted by ring overflow or by TTL expiry of the owning task's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalHistoryEntry {
    pub task_id: TaskId,
    pub tag: ProposalOutcomeTag,
    pub recorded_at_ms: u64,
    #[serde(default)]
    pub candidate: Option<CandidateCapability>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Terminal decision of one proposal attempt, as returned to the caller.
/// `Debounced` is the only decision that writes no history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalDecision {
    Debounced {
        since_last_ms: u64,
    },
    Skipped,
    AdvisoryOnly {
        candidate: CandidateCapability,
    },
    Blocked {
        reason: String,
    },
    ReductionError {
        reason: FallbackReason,
    },
    Errored {
        detail: String,
    },
    Registered {
        capability_id: String,
    },
}

impl ProposalDecision {
    pub fn outcome_tag(&self) -> Option<ProposalOutcomeTag> {
        match self {
            ProposalDecision::Debounced { .. } => None,
            ProposalDecision::Skipped => Some(ProposalOutcomeTag::SkippedNoReductionClient),
            ProposalDecision::AdvisoryOnly { .. } => Some(ProposalOutcomeTag::AdvisoryOnly),
            ProposalDecision::Blocked { .. } => Some(ProposalOutcomeTag::Blocked),
            ProposalDecision::ReductionError { .. } => Some(ProposalOutcomeTag::ReductionError),
            ProposalDecision::Errored { .. } => Some(ProposalOutcomeTag::GenerationReturnedNull),
            ProposalDecision::Registered { .. } => Some(ProposalOutcomeTag::Allowed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalReport {
    pub task_id: TaskId,
    pub decision: ProposalDecision,
}

/// Budget for one generation stage: the proposal pipeline's budgets are
/// federated, not shared with the prose reasoning surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageBudget {
    pub max_output_tokens: u64,
    pub temperature_milli: u16,
    pub timeout_ms: u64,
}

impl Default for StageBudget {
    fn default() -> Self {
        Self {
            max_output_tokens: 1_024,
            temperature_milli: 400,
            timeout_ms: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StageBudgets {
    #[serde(default)]
    pub abstract_plan: StageBudget,
    #[serde(default)]
    pub detailed_plan: StageBudget,
    #[serde(default)]
    pub refine: StageBudget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFlowConfig {
    #[serde(default)]
    pub advisory_override: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_max_refine_iterations")]
    pub max_refine_iterations: u32,
    #[serde(default = "default_min_confidence_milli")]
    pub min_confidence_milli: u16,
    #[serde(default = "default_gate_timeout_ms")]
    pub gate_timeout_ms: u64,
    #[serde(default)]
    pub budgets: StageBudgets,
}

fn default_debounce_ms() -> u64 {
    10_000
}

fn default_max_refine_iterations() -> u32 {
    3
}

fn default_min_confidence_milli() -> u16 {
    700
}

fn default_gate_timeout_ms() -> u64 {
    10_000
}

impl Default for ProposalFlowConfig {
    fn default() -> Self {
        Self {
            advisory_override: false,
            debounce_ms: default_debounce_ms(),
            max_refine_iterations: default_max_refine_iterations(),
            min_confidence_milli: default_min_confidence_milli(),
            gate_timeout_ms: default_gate_timeout_ms(),
            budgets: StageBudgets::default(),
        }
    }
}
