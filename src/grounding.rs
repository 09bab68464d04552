use serde::{Deserialize, Serialize};

use crate::reduction::types::ReductionOutcome;

/// Report shape produced by the retired local grounding heuristics. Kept only
/// so ablation runs can be replayed; see `GroundingAdapter::ground`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalGroundingReport {
    pub passed: bool,
    pub reason: String,
    #[serde(default)]
    pub matched_action: Option<String>,
}

#[derive(Debug, Clone)]
pub enum GroundingSource<'a> {
    Authority(&'a ReductionOutcome),
    Legacy(&'a LocalGroundingReport),
}

/// Observability view over a grounding decision. The adapter relays what the
/// authority said; it never parses action, target, or amount substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingView {
    pub pass: bool,
    pub reason: String,
}

impl GroundingView {
    fn deny(reason: impl Into<String>) -> Self {
        Self {
            pass: false,
            reason: reason.into(),
        }
    }

    fn allow(reason: impl Into<String>) -> Self {
        Self {
            pass: true,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroundingAdapter {
    allow_legacy: bool,
}

impl GroundingAdapter {
    pub fn new(allow_legacy: bool) -> Self {
        Self { allow_legacy }
    }

    pub fn ground(&self, source: &GroundingSource<'_>) -> GroundingView {
        match source {
            // Compatibility shim for ablation runs. The one switch lives
            // here; everything outside this arm treats legacy shapes as
            // rejected.
            GroundingSource::Legacy(report) => {
                if self.allow_legacy {
                    tracing::warn!(
                        target: "grounding",
                        passed = report.passed,
                        "legacy_grounding_accepted"
                    );
                    return GroundingView {
                        pass: report.passed,
                        reason: format!("legacy:{}", report.reason),
                    };
                }
                tracing::debug!(target: "grounding", "legacy_grounding_rejected");
                GroundingView::deny("authority_required")
            }
            GroundingSource::Authority(outcome) => match outcome {
                ReductionOutcome::Fallback { reason, .. } => GroundingView::deny(reason.as_str()),
                ReductionOutcome::Processed { intent, .. } => {
                    if !intent.executable {
                        let reason = intent
                            .block_reason
                            .clone()
                            .or_else(|| {
                                intent
                                    .grounding
                                    .as_ref()
                                    .filter(|grounding| !grounding.passed)
                                    .map(|grounding| grounding.reason.clone())
                            })
                            .unwrap_or_else(|| "not_executable".to_string());
                        return GroundingView::deny(reason);
                    }
                    match &intent.grounding {
                        Some(grounding) => GroundingView::allow(grounding.reason.clone()),
                        None => GroundingView::allow("executable"),
                    }
                }
            },
        }
    }
}
