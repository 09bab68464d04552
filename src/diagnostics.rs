use serde::{Deserialize, Serialize};

use crate::{
    proposal::history::{HistoryStats, ProposalHistory},
    reduction::binding::ReducerBinding,
};

/// Read-only operational snapshot of the gate. No side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDiagnostics {
    pub reducer_bound: bool,
    pub history: HistoryStats,
}

pub fn snapshot(binding: &ReducerBinding, history: &ProposalHistory) -> GateDiagnostics {
    GateDiagnostics {
        reducer_bound: binding.is_bound(),
        history: history.stats(),
    }
}
