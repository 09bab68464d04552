use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use serde::Deserialize;
use serde_json::json;
use tokio::{
    sync::Mutex as AsyncMutex,
    time::{Duration, timeout},
};

use crate::{
    eligibility::{self, EligibilityReason},
    envelope::{Envelope, EnvelopeMeta, unix_millis},
    model::ports::{ModelPort, ModelRequest, ModelResponse},
    proposal::{
        error::{ProposalError, generation_failed, invalid_signal},
        history::ProposalHistory,
        prompts,
        types::{
            CandidateCapability, ImpasseSignal, ProposalDecision, ProposalFlowConfig,
            ProposalHistoryEntry, ProposalReport, ProposalStage, StageBudget, StageProvenance,
            TaskId,
        },
    },
    provenance::{canonicalize_json, sha256_hex},
    reduction::{
        binding::ReducerBinding,
        types::{FallbackReason, ReductionOutcome},
    },
    registry::{
        SharedCapabilityRegistry,
        error::RegistryErrorKind,
        types::{CapabilityDescriptor, CapabilityRegistration},
    },
};

#[derive(Debug, Clone)]
pub enum ProposalTelemetryEvent {
    ProposalStarted { task_id: TaskId },
    StageCompleted { task_id: TaskId, stage: &'static str },
    StageFailed { task_id: TaskId, stage: &'static str },
    ProposalSettled { task_id: TaskId, decision: &'static str },
}

pub type ProposalTelemetryHook = Arc<dyn Fn(ProposalTelemetryEvent) + Send + Sync>;

/// Multi-stage capability synthesis with the reduction gate in front of
/// registration. One proposal per task at a time; every settled attempt is
/// recorded in the per-task history.
pub struct ProposalFlow {
    model: Arc<dyn ModelPort>,
    binding: ReducerBinding,
    registry: SharedCapabilityRegistry,
    history: Arc<ProposalHistory>,
    config: ProposalFlowConfig,
    telemetry_hook: Option<ProposalTelemetryHook>,
    task_guards: Mutex<BTreeMap<TaskId, Arc<AsyncMutex<()>>>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RefineDraft {
    summary: String,
    specification: serde_json::Value,
    confidence: f64,
}

impl ProposalFlow {
    pub fn new(
        model: Arc<dyn ModelPort>,
        binding: ReducerBinding,
        registry: SharedCapabilityRegistry,
        history: Arc<ProposalHistory>,
        config: ProposalFlowConfig,
        telemetry_hook: Option<ProposalTelemetryHook>,
    ) -> Self {
        Self {
            model,
            binding,
            registry,
            history,
            config,
            telemetry_hook,
            task_guards: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn binding(&self) -> &ReducerBinding {
        &self.binding
    }

    pub fn history(&self) -> &ProposalHistory {
        &self.history
    }

    /// Runs one proposal attempt for the impasse's task. Serialized per task:
    /// a second call for the same task waits for the first to settle.
    pub async fn propose(&self, signal: &ImpasseSignal) -> Result<ProposalReport, ProposalError> {
        if signal.task_id.trim().is_empty() {
            return Err(invalid_signal("impasse task_id cannot be empty"));
        }
        if signal.description.trim().is_empty() {
            return Err(invalid_signal("impasse description cannot be empty"));
        }

        let guard = self.task_guard(&signal.task_id);
        let _locked = guard.lock().await;

        self.emit(ProposalTelemetryEvent::ProposalStarted {
            task_id: signal.task_id.clone(),
        });

        let now_ms = unix_millis();
        if let Some(last_ms) = self.history.last_proposal_ms(&signal.task_id) {
            let since_last_ms = now_ms.saturating_sub(last_ms);
            if since_last_ms < self.config.debounce_ms {
                tracing::debug!(
                    target: "proposal",
                    task_id = %signal.task_id,
                    since_last_ms = since_last_ms,
                    debounce_ms = self.config.debounce_ms,
                    "proposal_debounced"
                );
                return Ok(self.settle(
                    signal,
                    ProposalDecision::Debounced { since_last_ms },
                    None,
                    now_ms,
                ));
            }
        }

        let mut recorded_candidate: Option<CandidateCapability> = None;
        let decision = match self.binding.current() {
            None if !self.config.advisory_override => {
                // Cost avoidance during authority outages: no model call is
                // made for this decision at all.
                tracing::debug!(
                    target: "proposal",
                    task_id = %signal.task_id,
                    "proposal_skipped_no_reduction_client"
                );
                ProposalDecision::Skipped
            }
            None => match self.generate_candidate(signal).await {
                Err(err) => ProposalDecision::Errored {
                    detail: err.message,
                },
                Ok(candidate) => {
                    tracing::info!(
                        target: "proposal",
                        task_id = %signal.task_id,
                        capability_id = %candidate.capability_id,
                        "candidate_advisory_only"
                    );
                    ProposalDecision::AdvisoryOnly { candidate }
                }
            },
            Some(client) => match self.generate_candidate(signal).await {
                Err(err) => ProposalDecision::Errored {
                    detail: err.message,
                },
                Ok(candidate) => {
                    recorded_candidate = Some(candidate.clone());
                    let envelope = Envelope::build(
                        &candidate.summary,
                        EnvelopeMeta {
                            model_id: candidate
                                .provenance
                                .last()
                                .map(|record| record.model_id.clone()),
                            prompt_digest: None,
                        },
                    );
                    let outcome = client
                        .reduce(
                            &envelope,
                            Duration::from_millis(self.config.gate_timeout_ms.max(1)),
                        )
                        .await;
                    let eligibility = eligibility::derive(Some(&outcome));
                    match eligibility.reasoning {
                        EligibilityReason::AuthorityExecutable => {
                            self.register_candidate(candidate)
                        }
                        EligibilityReason::AuthorityNotExecutable => {
                            let reason = match &outcome {
                                ReductionOutcome::Processed { intent, .. } => intent
                                    .block_reason
                                    .clone()
                                    .unwrap_or_else(|| "not_executable".to_string()),
                                ReductionOutcome::Fallback { .. } => "not_executable".to_string(),
                            };
                            tracing::info!(
                                target: "proposal",
                                task_id = %signal.task_id,
                                capability_id = %candidate.capability_id,
                                reason = %reason,
                                "candidate_blocked"
                            );
                            ProposalDecision::Blocked { reason }
                        }
                        EligibilityReason::AuthorityUnavailable
                        | EligibilityReason::NoReduction => {
                            let reason = outcome
                                .fallback_reason()
                                .unwrap_or(FallbackReason::Unavailable);
                            tracing::warn!(
                                target: "proposal",
                                task_id = %signal.task_id,
                                reason = reason.as_str(),
                                "candidate_reduction_error"
                            );
                            ProposalDecision::ReductionError { reason }
                        }
                    }
                }
            },
        };

        Ok(self.settle(signal, decision, recorded_candidate, unix_millis()))
    }

    fn register_candidate(&self, candidate: CandidateCapability) -> ProposalDecision {
        let registration = CapabilityRegistration {
            descriptor: CapabilityDescriptor {
                capability_id: candidate.capability_id.clone(),
                task_id: candidate.task_id.clone(),
                summary: candidate.summary.clone(),
                specification: candidate.specification.clone(),
                registered_at_ms: unix_millis(),
            },
        };

        match self.registry.register(registration) {
            Ok(()) => {
                tracing::info!(
                    target: "proposal",
                    task_id = %candidate.task_id,
                    capability_id = %candidate.capability_id,
                    "candidate_registered"
                );
                ProposalDecision::Registered {
                    capability_id: candidate.capability_id,
                }
            }
            // The id is content-derived, so a conflict means this exact
            // specification already cleared the gate earlier.
            Err(err) if err.kind == RegistryErrorKind::Conflict => {
                tracing::debug!(
                    target: "proposal",
                    capability_id = %candidate.capability_id,
                    "candidate_already_registered"
                );
                ProposalDecision::Registered {
                    capability_id: candidate.capability_id,
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "proposal",
                    capability_id = %candidate.capability_id,
                    error = %err,
                    "candidate_registration_invalid"
                );
                ProposalDecision::Errored {
                    detail: format!("registration rejected: {err}"),
                }
            }
        }
    }

    fn settle(
        &self,
        signal: &ImpasseSignal,
        decision: ProposalDecision,
        gated_candidate: Option<CandidateCapability>,
        now_ms: u64,
    ) -> ProposalReport {
        if let Some(tag) = decision.outcome_tag() {
            let (candidate, detail) = match &decision {
                ProposalDecision::AdvisoryOnly { candidate } => (Some(candidate.clone()), None),
                ProposalDecision::Blocked { reason } => (gated_candidate, Some(reason.clone())),
                ProposalDecision::ReductionError { reason } => {
                    (gated_candidate, Some(reason.as_str().to_string()))
                }
                ProposalDecision::Errored { detail } => (None, Some(detail.clone())),
                ProposalDecision::Registered { capability_id } => {
                    (gated_candidate, Some(capability_id.clone()))
                }
                ProposalDecision::Skipped | ProposalDecision::Debounced { .. } => (None, None),
            };
            self.history.record(
                ProposalHistoryEntry {
                    task_id: signal.task_id.clone(),
                    tag,
                    recorded_at_ms: now_ms,
                    candidate,
                    detail,
                },
                now_ms,
            );
        }

        let decision_label = match &decision {
            ProposalDecision::Debounced { .. } => "debounced",
            ProposalDecision::Skipped => "skipped",
            ProposalDecision::AdvisoryOnly { .. } => "advisory_only",
            ProposalDecision::Blocked { .. } => "blocked",
            ProposalDecision::ReductionError { .. } => "reduction_error",
            ProposalDecision::Errored { .. } => "errored",
            ProposalDecision::Registered { .. } => "registered",
        };
        self.emit(ProposalTelemetryEvent::ProposalSettled {
            task_id: signal.task_id.clone(),
            decision: decision_label,
        });

        ProposalReport {
            task_id: signal.task_id.clone(),
            decision,
        }
    }

    /// Abstract plan, detailed plan, then bounded refinement. Returns a
    /// candidate or a human-readable account of what made the generation
    /// unusable.
    async fn generate_candidate(
        &self,
        signal: &ImpasseSignal,
    ) -> Result<CandidateCapability, ProposalError> {
        let mut provenance = Vec::new();

        let abstract_plan = self
            .call_stage(
                signal,
                ProposalStage::AbstractPlanning,
                &self.config.budgets.abstract_plan,
                prompts::abstract_plan_prompt(signal),
                0,
                &mut provenance,
            )
            .await?;

        let detailed_plan = self
            .call_stage(
                signal,
                ProposalStage::DetailedPlanning,
                &self.config.budgets.detailed_plan,
                prompts::detailed_plan_prompt(signal, &abstract_plan),
                0,
                &mut provenance,
            )
            .await?;

        let mut best_draft: Option<RefineDraft> = None;
        for iteration in 0..self.config.max_refine_iterations.max(1) {
            let previous = best_draft
                .as_ref()
                .map(|draft| json!({
                    "summary": draft.summary,
                    "specification": draft.specification,
                    "confidence": draft.confidence,
                }));
            let raw = match self
                .call_stage(
                    signal,
                    ProposalStage::Refining,
                    &self.config.budgets.refine,
                    prompts::refine_prompt(signal, &detailed_plan, previous.as_ref(), iteration),
                    iteration,
                    &mut provenance,
                )
                .await
            {
                Ok(raw) => raw,
                // A failed iteration does not discard an earlier usable draft.
                Err(err) if best_draft.is_some() => {
                    tracing::debug!(
                        target: "proposal",
                        task_id = %signal.task_id,
                        iteration = iteration,
                        detail = %err,
                        "refine_iteration_failed_keep_draft"
                    );
                    break;
                }
                Err(err) => return Err(err),
            };

            match parse_json_output::<RefineDraft>(&raw) {
                Ok(draft) if draft.summary.trim().is_empty() => {
                    tracing::debug!(
                        target: "proposal",
                        task_id = %signal.task_id,
                        iteration = iteration,
                        "refine_draft_empty_summary"
                    );
                }
                Ok(draft) => {
                    let confident =
                        draft.confidence * 1_000.0 >= self.config.min_confidence_milli as f64;
                    best_draft = Some(draft);
                    if confident {
                        break;
                    }
                }
                Err(detail) => {
                    tracing::debug!(
                        target: "proposal",
                        task_id = %signal.task_id,
                        iteration = iteration,
                        detail = %detail,
                        "refine_draft_unparseable"
                    );
                }
            }
        }

        let draft = best_draft
            .ok_or_else(|| generation_failed("refinement produced no usable specification"))?;

        if !draft.specification.is_object() {
            return Err(generation_failed("candidate specification is not a JSON object"));
        }

        let capability_id = derive_capability_id(&signal.task_id, &draft.specification);
        Ok(CandidateCapability {
            capability_id,
            task_id: signal.task_id.clone(),
            summary: draft.summary,
            specification: draft.specification,
            provenance,
        })
    }

    async fn call_stage(
        &self,
        signal: &ImpasseSignal,
        stage: ProposalStage,
        budget: &StageBudget,
        prompt: String,
        iteration: u32,
        provenance: &mut Vec<StageProvenance>,
    ) -> Result<String, ProposalError> {
        let request = ModelRequest {
            request_id: format!(
                "proposal-{}-{}-{}",
                stage.as_str(),
                signal.task_id,
                iteration
            ),
            stage: stage.as_str(),
            prompt,
            max_output_tokens: budget.max_output_tokens,
            temperature_milli: budget.temperature_milli,
            timeout_ms: budget.timeout_ms,
        };

        let deadline = Duration::from_millis(budget.timeout_ms.max(1));
        let completed = timeout(deadline, self.model.complete(request)).await;

        let response: ModelResponse = match completed {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                self.emit(ProposalTelemetryEvent::StageFailed {
                    task_id: signal.task_id.clone(),
                    stage: stage.as_str(),
                });
                tracing::warn!(
                    target: "proposal",
                    task_id = %signal.task_id,
                    stage = stage.as_str(),
                    error = %err,
                    "stage_failed"
                );
                return Err(generation_failed(format!("{} failed: {err}", stage.as_str())));
            }
            Err(_) => {
                self.emit(ProposalTelemetryEvent::StageFailed {
                    task_id: signal.task_id.clone(),
                    stage: stage.as_str(),
                });
                tracing::warn!(
                    target: "proposal",
                    task_id = %signal.task_id,
                    stage = stage.as_str(),
                    deadline_ms = deadline.as_millis() as u64,
                    "stage_timeout"
                );
                return Err(generation_failed(format!("{} timed out", stage.as_str())));
            }
        };

        provenance.push(StageProvenance {
            stage,
            model_id: response.model_id.clone(),
            elapsed_ms: response.elapsed_ms,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        });
        self.emit(ProposalTelemetryEvent::StageCompleted {
            task_id: signal.task_id.clone(),
            stage: stage.as_str(),
        });

        match response.output_text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(generation_failed(format!(
                "{} produced no output",
                stage.as_str()
            ))),
        }
    }

    fn task_guard(&self, task_id: &str) -> Arc<AsyncMutex<()>> {
        let mut guards = self.task_guards.lock().expect("lock poisoned");
        guards
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn emit(&self, event: ProposalTelemetryEvent) {
        if let Some(hook) = &self.telemetry_hook {
            hook(event);
        }
    }
}

pub fn derive_capability_id(task_id: &str, specification: &serde_json::Value) -> String {
    let canonical = canonicalize_json(&json!({
        "task_id": task_id,
        "specification": specification,
    }));
    let hex = sha256_hex(canonical.to_string().as_bytes());
    format!("cap:{}", &hex[..24])
}

fn parse_json_output<T: for<'a> Deserialize<'a>>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty JSON output".to_string());
    }

    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    if let Some(stripped) = strip_code_fence(trimmed)
        && let Ok(parsed) = serde_json::from_str::<T>(&stripped)
    {
        return Ok(parsed);
    }

    Err("failed to parse JSON output".to_string())
}

fn strip_code_fence(text: &str) -> Option<String> {
    let text = text.trim();
    if !text.starts_with("```") {
        return None;
    }

    let mut lines = text.lines();
    let _first = lines.next()?;
    let mut body = Vec::new();
    for line in lines {
        if line.trim_start().starts_with("```") {
            break;
        }
        body.push(line);
    }
    Some(body.join("\n"))
}
