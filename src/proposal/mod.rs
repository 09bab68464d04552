pub mod error;
pub mod flow;
pub mod history;
pub mod prompts;
pub mod types;

pub use error::{ProposalError, ProposalErrorKind};
pub use flow::{ProposalFlow, ProposalTelemetryEvent, ProposalTelemetryHook};
pub use history::{HistoryStats, ProposalHistory, ProposalHistoryConfig};
pub use types::{
    CandidateCapability, ImpasseSignal, ProposalDecision, ProposalFlowConfig,
    ProposalHistoryEntry, ProposalOutcomeTag, ProposalReport, ProposalStage, StageBudget,
    StageBudgets, StageProvenance,
};
