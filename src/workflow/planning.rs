//! Plan synthesis from a natural-language request.
//!
//! One backend call produces a JSON plan, which is extracted, validated and
//! normalized into a [`Plan`] with deterministic ids and pending status.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use super::context::truncate_chars;
use super::error::WorkflowError;
use super::extract::extract_plan_block;
use super::model::{Plan, Priority, Task, TaskKind};
use crate::ai::{CompletionOptions, CompletionProvider};

const MAX_LOG_PREVIEW_CHARS: usize = 4_000;

/// Plan as the backend returns it, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPlan {
    #[serde(rename = "mainGoal", alias = "main_goal", alias = "goal")]
    pub main_goal: Option<String>,

    pub tasks: Option<Vec<RawTask>>,

    #[serde(rename = "contextFiles", alias = "context_files", alias = "contextPatterns")]
    pub context_files: Vec<String>,

    pub risks: Vec<String>,
}

/// Task as the backend returns it.
///
/// Ids may arrive as strings or numbers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTask {
    pub id: Option<Value>,

    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<String>,

    pub description: Option<String>,

    pub priority: Option<String>,

    pub dependencies: Vec<Value>,
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build the planning prompt for a request.
pub fn build_planning_prompt(request: &str) -> String {
    format!(
        r#"You are a software planning assistant. Break the following request into a
structured plan of concrete subtasks that a coding assistant can execute one at a time.

Request:
{request}

Respond with a single JSON object inside a ```json fenced block, using exactly this shape:

{{
  "mainGoal": "one-sentence summary of the intent",
  "tasks": [
    {{
      "id": "task-1",
      "type": "code_modification | file_creation | code_analysis | refactoring",
      "description": "precise instruction for this subtask",
      "priority": "high | medium | low",
      "dependencies": ["ids of tasks that must finish first"]
    }}
  ],
  "contextFiles": ["paths or glob patterns of files needed as context"],
  "risks": ["short notes on what could go wrong"]
}}

Rules:
1. Every dependency must be the id of another task in this plan
2. Order tasks so foundations come first
3. Keep descriptions self-contained; each task is executed separately
4. Do not include any text outside the JSON block"#
    )
}

/// Validate and normalize a raw plan.
///
/// Missing task ids become `task-<n>` (1-based), every task starts pending,
/// and the plan gets a fresh id and creation time.
pub fn validate_plan(raw: RawPlan, request: &str) -> Result<Plan, WorkflowError> {
    let main_goal = raw
        .main_goal
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .ok_or_else(|| WorkflowError::PlanValidation("missing mainGoal".to_string()))?;

    let raw_tasks = raw.tasks.unwrap_or_default();
    if raw_tasks.is_empty() {
        return Err(WorkflowError::PlanValidation("plan has no tasks".to_string()));
    }

    let mut tasks = Vec::with_capacity(raw_tasks.len());
    for (index, raw_task) in raw_tasks.into_iter().enumerate() {
        let id = raw_task
            .id
            .as_ref()
            .and_then(value_to_id)
            .unwrap_or_else(|| format!("task-{}", index + 1));

        let description = raw_task
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                WorkflowError::PlanValidation(format!("task {id} has no description"))
            })?;

        let kind = raw_task.kind.as_deref().map_or(TaskKind::CodeModification, TaskKind::parse);
        let priority = raw_task.priority.as_deref().map_or(Priority::Medium, Priority::parse);
        let dependencies: Vec<String> =
            raw_task.dependencies.iter().filter_map(value_to_id).collect();

        tasks.push(
            Task::new(id, kind, description).with_priority(priority).with_dependencies(dependencies),
        );
    }

    let mut seen = HashSet::new();
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(WorkflowError::PlanValidation(format!("duplicate task id {}", task.id)));
        }
    }
    for task in &tasks {
        if let Some(missing) = task.dependencies.iter().find(|d| !seen.contains(d.as_str())) {
            return Err(WorkflowError::PlanValidation(format!(
                "task {} depends on unknown task {}",
                task.id, missing
            )));
        }
    }

    let mut plan = Plan::new(main_goal, request).with_tasks(tasks);
    plan.context_patterns = raw.context_files.into_iter().filter(|p| !p.trim().is_empty()).collect();
    plan.risks = raw.risks;
    Ok(plan)
}

/// Parse a backend response into a validated plan.
pub fn parse_plan_response(response: &str, request: &str) -> Result<Plan, WorkflowError> {
    let value = extract_plan_block(response)?;
    let raw: RawPlan = serde_json::from_value(value)
        .map_err(|e| WorkflowError::PlanValidation(format!("malformed plan fields: {e}")))?;
    validate_plan(raw, request)
}

/// Turns requests into plans via a completion backend.
pub struct PlanSynthesizer<'a> {
    provider: &'a dyn CompletionProvider,
    options: CompletionOptions,
}

impl<'a> PlanSynthesizer<'a> {
    pub fn new(provider: &'a dyn CompletionProvider) -> Self {
        Self { provider, options: CompletionOptions::planning() }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    /// Synthesize a plan. No retry happens at this layer.
    pub async fn synthesize(&self, request: &str) -> Result<Plan, WorkflowError> {
        let prompt = build_planning_prompt(request);
        tracing::info!(
            provider = self.provider.name(),
            request_len = request.len(),
            "Requesting plan"
        );
        tracing::debug!(prompt = %truncate_chars(&prompt, MAX_LOG_PREVIEW_CHARS), "Planning prompt");

        let response = self.provider.complete(&prompt, &self.options).await?;
        tracing::debug!(
            response = %truncate_chars(&response, MAX_LOG_PREVIEW_CHARS),
            "Planning response"
        );

        let plan = parse_plan_response(&response, request)?;
        tracing::info!(plan = %plan.id, tasks = plan.tasks.len(), goal = %plan.main_goal, "Plan created");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AIError;
    use crate::workflow::model::{PlanStatus, TaskStatus};
    use async_trait::async_trait;

    struct Canned(Result<String, AIError>);

    #[async_trait]
    impl CompletionProvider for Canned {
        async fn complete(&self, _: &str, _: &CompletionOptions) -> Result<String, AIError> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "canned"
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_parse_and_normalize() {
        let response = r#"```json
{
  "mainGoal": "Add a health endpoint",
  "tasks": [
    {"type": "code_analysis", "description": "Find the router", "priority": "HIGH"},
    {"id": "wire", "type": "code_modification", "description": "Add route", "dependencies": ["task-1"]},
    {"type": "deploy", "description": "Ship it", "priority": "low", "dependencies": ["wire"]}
  ],
  "contextFiles": ["src/**/*.rs", ""],
  "risks": ["Route conflicts"]
}
```"#;

        let plan = parse_plan_response(response, "add /health").unwrap();
        assert_eq!(plan.main_goal, "Add a health endpoint");
        assert_eq!(plan.original_request, "add /health");
        assert_eq!(plan.status, PlanStatus::Pending);
        assert!(plan.results.is_empty());

        let ids: Vec<_> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task-1", "wire", "task-3"]);
        assert_eq!(plan.tasks[0].priority, Priority::High);
        assert_eq!(plan.tasks[1].priority, Priority::Medium);
        assert_eq!(plan.tasks[2].kind, TaskKind::Other("deploy".to_string()));
        assert!(plan
            .tasks
            .iter()
            .all(|t| t.status == TaskStatus::Pending && t.started_at.is_none() && t.ended_at.is_none()));
        assert_eq!(plan.context_patterns, vec!["src/**/*.rs".to_string()]);
        assert_eq!(plan.risks, vec!["Route conflicts".to_string()]);
    }

    #[test]
    fn test_numeric_ids_and_snake_case_fields() {
        let response = r#"{"main_goal": "g", "tasks": [
            {"id": 1, "type": "refactoring", "description": "a"},
            {"id": 2, "type": "refactoring", "description": "b", "dependencies": [1]}
        ], "context_files": ["README.md"]}"#;

        let plan = parse_plan_response(response, "r").unwrap();
        assert_eq!(plan.tasks[1].dependencies, vec!["1".to_string()]);
        assert_eq!(plan.context_patterns, vec!["README.md".to_string()]);
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            r#"{"tasks": [{"description": "x"}]}"#,
            r#"{"mainGoal": "  ", "tasks": [{"description": "x"}]}"#,
            r#"{"mainGoal": "g", "tasks": []}"#,
            r#"{"mainGoal": "g"}"#,
            r#"{"mainGoal": "g", "tasks": [{"id": "a"}]}"#,
            r#"{"mainGoal": "g", "tasks": [{"id": "a", "description": "x"}, {"id": "a", "description": "y"}]}"#,
            r#"{"mainGoal": "g", "tasks": [{"description": "x", "dependencies": ["nope"]}]}"#,
            r#"{"mainGoal": "g", "tasks": "not a list"}"#,
        ];

        for case in cases {
            let err = parse_plan_response(case, "r").unwrap_err();
            assert!(matches!(err, WorkflowError::PlanValidation(_)), "case {case} gave {err:?}");
        }
    }

    #[test]
    fn test_parse_error_without_block() {
        let err = parse_plan_response("I cannot plan this.", "r").unwrap_err();
        assert!(matches!(err, WorkflowError::PlanParse(_)));
    }

    #[test]
    fn test_trailing_comma_plan_is_parse_error() {
        let response = "```json\n{\"mainGoal\": \"g\", \"tasks\": [{\"id\": \"a\", \"description\": \"x\"},],}\n```";
        let err = parse_plan_response(response, "r").unwrap_err();
        assert!(matches!(err, WorkflowError::PlanParse(_)), "got {err:?}");
    }

    #[test]
    fn test_prompt_embeds_request() {
        let prompt = build_planning_prompt("rename the config module");
        assert!(prompt.contains("rename the config module"));
        assert!(prompt.contains("\"mainGoal\""));
        assert!(prompt.contains("```json"));
    }

    #[tokio::test]
    async fn test_synthesizer_propagates_backend_error() {
        let provider = Canned(Err(AIError::Timeout(5)));
        let err = PlanSynthesizer::new(&provider).synthesize("x").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Backend(AIError::Timeout(5))));
        assert!(err.is_synthesis_error());
    }

    #[tokio::test]
    async fn test_synthesizer_builds_plan() {
        let provider = Canned(Ok(
            r#"{"mainGoal": "g", "tasks": [{"type": "code_analysis", "description": "look"}]}"#
                .to_string(),
        ));
        let plan = PlanSynthesizer::new(&provider).synthesize("req").await.unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].id, "task-1");
    }
}
