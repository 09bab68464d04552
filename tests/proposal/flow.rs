use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use thalamus::{
    diagnostics,
    model::{ModelPort, ModelRequest, ModelResponse, error::ModelError},
    proposal::{
        ProposalFlow, ProposalHistory, ProposalHistoryConfig,
        types::{
            ImpasseSignal, ProposalDecision, ProposalFlowConfig, ProposalOutcomeTag,
        },
    },
    reduction::{
        ReducerBinding, ReducerPort, ReductionClient,
        error::{ReductionError, transport_failure},
        types::FallbackReason,
    },
    registry::{CapabilityRegistryPort, InMemoryCapabilityRegistry},
};

type ModelHook =
    Arc<dyn Fn(&ModelRequest) -> Result<Option<String>, ModelError> + Send + Sync>;

struct HookModel {
    hook: ModelHook,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ModelPort for HookModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output_text = (self.hook)(&request)?;
        Ok(ModelResponse {
            output_text,
            model_id: "test-model".to_string(),
            elapsed_ms: 3,
            input_tokens: Some(64),
            output_tokens: Some(32),
        })
    }
}

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

struct UnreachableReducer;

#[async_trait]
impl ReducerPort for UnreachableReducer {
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
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        Ok(serde_json::json!({}))
    }
}

fn scripted_generation() -> ModelHook {
    Arc::new(|request: &ModelRequest| {
        let output = match request.stage {
            "abstract_planning" => "Learn to strip-mine for coal.".to_string(),
            "detailed_planning" => {
                "1) find stone 2) dig corridor 3) collect exposed coal".to_string()
            }
            "refining" => serde_json::json!({
                "summary": "Mine the exposed coal vein north of the base",
                "specification": {
                    "action": "mine",
                    "target": "coal_ore",
                    "steps": ["equip_pickaxe", "walk_to_vein", "mine_until_empty"],
                },
                "confidence": 0.9,
            })
            .to_string(),
            other => panic!("unexpected stage {other}"),
        };
        Ok(Some(output))
    })
}

fn signal() -> ImpasseSignal {
    ImpasseSignal {
        task_id: "task:mine-coal".to_string(),
        description: "I should mine coal".to_string(),
        failure_count: 3,
    }
}

struct Harness {
    flow: ProposalFlow,
    registry: Arc<InMemoryCapabilityRegistry>,
    history: Arc<ProposalHistory>,
    calls: Arc<AtomicUsize>,
}

fn harness(binding: ReducerBinding, hook: ModelHook, config: ProposalFlowConfig) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let model = Arc::new(HookModel {
        hook,
        calls: calls.clone(),
    });
    let registry = Arc::new(InMemoryCapabilityRegistry::new());
    let history = Arc::new(ProposalHistory::new(ProposalHistoryConfig::default()));
    let flow = ProposalFlow::new(
        model,
        binding,
        registry.clone(),
        history.clone(),
        config,
        None,
    );
    Harness {
        flow,
        registry,
        history,
        calls,
    }
}

fn executable_binding() -> ReducerBinding {
    let reducer = StaticReducer {
        response: serde_json::json!({
            "intent_family": "gathering",
            "intent_type": "mine",
            "is_executable": true,
            "grounding": {"passed": true, "reason": "coal nearby"},
        }),
    };
    ReducerBinding::bound(Arc::new(ReductionClient::new(Arc::new(reducer))))
}

#[tokio::test]
async fn impasse_without_binding_is_skipped_with_zero_model_calls() {
    let setup = harness(
        ReducerBinding::new(),
        scripted_generation(),
        ProposalFlowConfig::default(),
    );

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    assert!(matches!(report.decision, ProposalDecision::Skipped));
    assert_eq!(setup.calls.load(Ordering::SeqCst), 0);

    let entries = setup.history.entries("task:mine-coal");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tag, ProposalOutcomeTag::SkippedNoReductionClient);

    let snapshot = diagnostics::snapshot(setup.flow.binding(), setup.flow.history());
    assert!(!snapshot.reducer_bound);
    assert_eq!(snapshot.history.total_entries, 1);
    assert_eq!(snapshot.history.task_count, 1);
}

#[tokio::test]
async fn skipped_exit_still_arms_the_debounce_clock() {
    let setup = harness(
        ReducerBinding::new(),
        scripted_generation(),
        ProposalFlowConfig::default(),
    );

    let first = setup
        .flow
        .propose(&signal())
        .await
        .expect("first proposal should settle");
    assert!(matches!(first.decision, ProposalDecision::Skipped));

    // Immediately after a skip, the follow-up impasse is held back by the
    // debounce window, not by the missing binding.
    let second = setup
        .flow
        .propose(&signal())
        .await
        .expect("second proposal should settle");
    assert!(matches!(second.decision, ProposalDecision::Debounced { .. }));

    assert_eq!(setup.history.entries("task:mine-coal").len(), 1);
    assert_eq!(setup.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn advisory_override_generates_but_never_registers() {
    let config = ProposalFlowConfig {
        advisory_override: true,
        ..ProposalFlowConfig::default()
    };
    let setup = harness(ReducerBinding::new(), scripted_generation(), config);

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    match &report.decision {
        ProposalDecision::AdvisoryOnly { candidate } => {
            assert_eq!(candidate.summary, "Mine the exposed coal vein north of the base");
            assert!(candidate.capability_id.starts_with("cap:"));
            assert_eq!(candidate.provenance.len(), 3);
        }
        other => panic!("expected advisory-only, got {other:?}"),
    }

    assert_eq!(setup.calls.load(Ordering::SeqCst), 3);
    assert_eq!(setup.registry.catalog_snapshot().entries.len(), 0);

    let entries = setup.history.entries("task:mine-coal");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tag, ProposalOutcomeTag::AdvisoryOnly);
    assert!(entries[0].candidate.is_some());
}

#[tokio::test]
async fn executable_candidate_is_registered() {
    let setup = harness(
        executable_binding(),
        scripted_generation(),
        ProposalFlowConfig::default(),
    );

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    let capability_id = match &report.decision {
        ProposalDecision::Registered { capability_id } => capability_id.clone(),
        other => panic!("expected registered, got {other:?}"),
    };

    assert!(setup.registry.resolve(&capability_id).is_some());
    let entries = setup.history.entries("task:mine-coal");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].tag, ProposalOutcomeTag::Allowed);
    assert!(entries[0].candidate.is_some());
}

#[tokio::test]
async fn not_executable_candidate_is_blocked() {
    let reducer = StaticReducer {
        response: serde_json::json!({
            "intent_family": "gathering",
            "intent_type": "mine",
            "is_executable": false,
            "block_reason": "references a nonexistent entity",
        }),
    };
    let binding = ReducerBinding::bound(Arc::new(ReductionClient::new(Arc::new(reducer))));
    let setup = harness(binding, scripted_generation(), ProposalFlowConfig::default());

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    match &report.decision {
        ProposalDecision::Blocked { reason } => {
            assert_eq!(reason, "references a nonexistent entity");
        }
        other => panic!("expected blocked, got {other:?}"),
    }

    assert_eq!(setup.registry.catalog_snapshot().entries.len(), 0);
    let entries = setup.history.entries("task:mine-coal");
    assert_eq!(entries[0].tag, ProposalOutcomeTag::Blocked);
    assert!(entries[0].candidate.is_some());
}

#[tokio::test]
async fn reducer_outage_fails_closed_and_registers_nothing() {
    let binding =
        ReducerBinding::bound(Arc::new(ReductionClient::new(Arc::new(UnreachableReducer))));
    let setup = harness(binding, scripted_generation(), ProposalFlowConfig::default());

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    match &report.decision {
        ProposalDecision::ReductionError { reason } => {
            assert_eq!(*reason, FallbackReason::TransportError);
        }
        other => panic!("expected reduction error, got {other:?}"),
    }

    assert_eq!(setup.registry.catalog_snapshot().entries.len(), 0);
    let entries = setup.history.entries("task:mine-coal");
    assert_eq!(entries[0].tag, ProposalOutcomeTag::ReductionError);
}

#[tokio::test]
async fn reducer_that_always_times_out_never_registers_anything() {
    let binding =
        ReducerBinding::bound(Arc::new(ReductionClient::new(Arc::new(HangingReducer))));
    let config = ProposalFlowConfig {
        gate_timeout_ms: 20,
        ..ProposalFlowConfig::default()
    };
    let setup = harness(binding, scripted_generation(), config);

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    match &report.decision {
        ProposalDecision::ReductionError { reason } => {
            assert_eq!(*reason, FallbackReason::Timeout);
        }
        other => panic!("expected reduction error, got {other:?}"),
    }
    assert_eq!(setup.registry.catalog_snapshot().entries.len(), 0);
}

#[tokio::test]
async fn unusable_generation_is_errored_not_blocked() {
    let hook: ModelHook = Arc::new(|_request: &ModelRequest| Ok(Some("   ".to_string())));
    let setup = harness(executable_binding(), hook, ProposalFlowConfig::default());

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    assert!(matches!(report.decision, ProposalDecision::Errored { .. }));
    assert_eq!(setup.registry.catalog_snapshot().entries.len(), 0);

    let entries = setup.history.entries("task:mine-coal");
    assert_eq!(entries[0].tag, ProposalOutcomeTag::GenerationReturnedNull);
}

#[tokio::test]
async fn refinement_iterates_until_the_confidence_threshold() {
    let refine_round = Arc::new(AtomicUsize::new(0));
    let refine_round_hook = refine_round.clone();
    let hook: ModelHook = Arc::new(move |request: &ModelRequest| {
        let output = match request.stage {
            "abstract_planning" => "sketch".to_string(),
            "detailed_planning" => "plan".to_string(),
            "refining" => {
                let round = refine_round_hook.fetch_add(1, Ordering::SeqCst);
                let confidence = if round == 0 { 0.2 } else { 0.95 };
                serde_json::json!({
                    "summary": "Mine the exposed coal vein",
                    "specification": {"action": "mine", "target": "coal_ore"},
                    "confidence": confidence,
                })
                .to_string()
            }
            other => panic!("unexpected stage {other}"),
        };
        Ok(Some(output))
    });
    let setup = harness(executable_binding(), hook, ProposalFlowConfig::default());

    let report = setup
        .flow
        .propose(&signal())
        .await
        .expect("proposal should settle");

    assert!(matches!(report.decision, ProposalDecision::Registered { .. }));
    // abstract + detailed + two refine rounds
    assert_eq!(setup.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn noop_wiring_settles_errored_without_registration() {
    // A bound NoopReducer and a NoopModel: generation fails first, so the
    // exit is errored rather than a reduction fallback, and nothing is
    // registered.
    let binding = ReducerBinding::bound(Arc::new(ReductionClient::new(Arc::new(
        thalamus::reduction::NoopReducer,
    ))));
    let registry = Arc::new(InMemoryCapabilityRegistry::new());
    let history = Arc::new(ProposalHistory::new(ProposalHistoryConfig::default()));
    let flow = ProposalFlow::new(
        Arc::new(thalamus::model::NoopModel),
        binding,
        registry.clone(),
        history.clone(),
        ProposalFlowConfig::default(),
        None,
    );

    let report = flow.propose(&signal()).await.expect("proposal should settle");

    assert!(matches!(report.decision, ProposalDecision::Errored { .. }));
    assert_eq!(registry.catalog_snapshot().entries.len(), 0);
    assert_eq!(
        history.entries("task:mine-coal")[0].tag,
        ProposalOutcomeTag::GenerationReturnedNull
    );
}

#[tokio::test]
async fn invalid_impasse_signal_is_rejected_locally() {
    let setup = harness(
        executable_binding(),
        scripted_generation(),
        ProposalFlowConfig::default(),
    );

    let err = setup
        .flow
        .propose(&ImpasseSignal {
            task_id: "  ".to_string(),
            description: "stuck".to_string(),
            failure_count: 1,
        })
        .await
        .expect_err("blank task_id should be rejected");
    assert!(err.message.contains("task_id"));
    assert_eq!(setup.calls.load(Ordering::SeqCst), 0);
}
