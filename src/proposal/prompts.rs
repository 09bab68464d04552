use crate::proposal::types::ImpasseSignal;

pub fn abstract_plan_prompt(signal: &ImpasseSignal) -> String {
    format!(
        "The agent is stuck on a task and needs a new capability.\nTask: {}\nConsecutive failures: {}\nDescribe, in a short paragraph, one capability that would unblock this task.\nReturn plain text only.",
        signal.description, signal.failure_count
    )
}

pub fn detailed_plan_prompt(signal: &ImpasseSignal, abstract_plan: &str) -> String {
    format!(
        "Expand the capability sketch below into a concrete plan.\nList the steps, the preconditions, and the observable result.\nReturn plain text only.\n\nTask: {}\nSketch:\n{}",
        signal.description, abstract_plan
    )
}

pub fn refine_prompt(
    signal: &ImpasseSignal,
    detailed_plan: &str,
    previous_draft: Option<&serde_json::Value>,
    iteration: u32,
) -> String {
    let previous_section = previous_draft
        .map(|draft| {
            format!(
                "Previous draft (iteration {}):\n{}\nImprove it.\n",
                iteration,
                serde_json::to_string_pretty(draft).unwrap_or_else(|_| "{}".to_string())
            )
        })
        .unwrap_or_default();

    format!(
        "Produce a capability specification as JSON.\nRules:\n1) Return a single JSON object, no prose around it.\n2) Required keys: \"summary\" (one sentence, natural language), \"specification\" (object), \"confidence\" (0.0 to 1.0).\n3) \"specification\" must be self-contained and executable by the runtime as written.\n\nTask: {}\nPlan:\n{}\n{}",
        signal.description, detailed_plan, previous_section
    )
}
