use crate::types::ExecutionPlan;
use async_trait::async_trait;
use hivemind_core::HivemindResult;

/// External collaborator that turns an instruction into text.
///
/// The orchestrator consults it for planning, synthesis, and reduction; it
/// is the only place the swarm touches a reasoning backend. Implementations
/// wrap an LLM API, a rules engine, or a test double.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Produces a completion for `user_prompt` under `system_prompt`.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> HivemindResult<String>;
}

/// System prompt for the planning call, parameterized on the role catalogue.
pub(crate) fn planner_system_prompt(roles: &[String]) -> String {
    format!(
        "You are a task planner. Analyze the task and return a JSON object:\n\
         {{\n\
         \x20   \"strategy\": \"fan-out\" | \"pipeline\" | \"map-reduce\",\n\
         \x20   \"workers\": [\"required\", \"worker\", \"roles\"],\n\
         \x20   \"subtasks\": [{{\"worker\": \"role\", \"instruction\": \"specific instruction\"}}],\n\
         \x20   \"rationale\": \"why this choice\"\n\
         }}\n\n\
         Available workers: {}\n\n\
         Return ONLY the JSON, with no markdown or extra explanation.",
        roles.join(", ")
    )
}

pub(crate) const SYNTHESIS_SYSTEM_PROMPT: &str =
    "You are the coordinator of a team of specialized agents. Synthesize the \
     workers' results into one consolidated answer: an executive summary, the \
     main findings, any conflicts between workers, and recommended next steps.";

pub(crate) const REDUCE_SYSTEM_PROMPT: &str =
    "You are the reducer of a map-reduce execution. Aggregate the chunk \
     results into one unified answer: identify patterns, aggregate metrics, \
     and synthesize insights.";

/// Extracts an [`ExecutionPlan`] from a reasoning response.
///
/// Tries a direct parse first, then the first balanced JSON object embedded
/// anywhere in the text (planners routinely wrap the object in prose or
/// markdown fences). Returns `None` when no well-formed object is found —
/// callers fall back to a deterministic single-worker plan.
pub fn extract_plan(text: &str) -> Option<ExecutionPlan> {
    if let Ok(plan) = serde_json::from_str(text.trim()) {
        return Some(plan);
    }
    first_json_object(text).and_then(|raw| serde_json::from_str(raw).ok())
}

/// Finds the first balanced `{...}` in `text`, respecting string literals
/// and escapes.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
