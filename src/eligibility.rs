use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reduction::types::ReductionOutcome;

/// Reasoning tags for an eligibility decision. One per branch of `derive`,
/// nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    NoReduction,
    AuthorityUnavailable,
    AuthorityExecutable,
    AuthorityNotExecutable,
}

impl EligibilityReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EligibilityReason::NoReduction => "no_reduction",
            EligibilityReason::AuthorityUnavailable => "authority_unavailable",
            EligibilityReason::AuthorityExecutable => "authority_executable",
            EligibilityReason::AuthorityNotExecutable => "authority_not_executable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub convert_eligible: bool,
    pub reasoning: EligibilityReason,
}

/// The single choke point for "may this output become an executable task".
/// Exactly four branches; any new eligibility-affecting signal must be folded
/// into `processed`/`executable` upstream, not added here.
pub fn derive(outcome: Option<&ReductionOutcome>) -> EligibilityResult {
    match outcome {
        None => EligibilityResult {
            convert_eligible: false,
            reasoning: EligibilityReason::NoReduction,
        },
        Some(outcome) if !outcome.processed() => EligibilityResult {
            convert_eligible: false,
            reasoning: EligibilityReason::AuthorityUnavailable,
        },
        Some(outcome) if outcome.executable() => EligibilityResult {
            convert_eligible: true,
            reasoning: EligibilityReason::AuthorityExecutable,
        },
        Some(_) => EligibilityResult {
            convert_eligible: false,
            reasoning: EligibilityReason::AuthorityNotExecutable,
        },
    }
}

/// Error raised only by `assert_invariant`. Distinguishable from every other
/// error in the crate so test harnesses can match on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityInvariantViolation {
    pub expected: bool,
    pub actual: bool,
    pub reasoning: EligibilityReason,
}

impl fmt::Display for EligibilityInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eligibility invariant violated: expected convert_eligible={}, got {} (reasoning={})",
            self.expected,
            self.actual,
            self.reasoning.as_str()
        )
    }
}

impl std::error::Error for EligibilityInvariantViolation {}

/// Recomputes the expected boolean from the outcome alone and compares it to
/// a result produced elsewhere. Verification use only; production decision
/// paths never call this.
pub fn assert_invariant(
    outcome: Option<&ReductionOutcome>,
    result: &EligibilityResult,
) -> Result<(), EligibilityInvariantViolation> {
    let expected = match outcome {
        None => false,
        Some(outcome) => outcome.processed() && outcome.executable(),
    };
    if result.convert_eligible != expected {
        return Err(EligibilityInvariantViolation {
            expected,
            actual: result.convert_eligible,
            reasoning: result.reasoning,
        });
    }
    Ok(())
}
