//! Plan and task data structures.
//!
//! A [`Plan`] is created once by the synthesizer and then mutated only by
//! the engine's state machine while it runs.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of work a task performs.
///
/// Unrecognised kinds coming from the backend are preserved in
/// [`TaskKind::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    CodeModification,
    FileCreation,
    CodeAnalysis,
    Refactoring,
    Other(String),
}

impl TaskKind {
    /// Parse a kind string, accepting `snake_case`, `kebab-case`, spaces and any casing.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();

        match normalized.as_str() {
            "code_modification" => Self::CodeModification,
            "file_creation" => Self::FileCreation,
            "code_analysis" => Self::CodeAnalysis,
            "refactoring" => Self::Refactoring,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Canonical name used in prompts and rendered output.
    pub fn as_str(&self) -> &str {
        match self {
            Self::CodeModification => "code_modification",
            Self::FileCreation => "file_creation",
            Self::CodeAnalysis => "code_analysis",
            Self::Refactoring => "refactoring",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
    /// A priority string the backend produced that we don't recognise.
    Unknown(String),
}

impl Priority {
    /// Parse a priority string. A missing priority is treated as medium by the caller.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Sort rank used for deadlock tie-breaks (lower runs first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Unknown(_) => 3,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown(raw) => raw,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Plan status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanStatus {
    Pending,
    InProgress,
    Completed,
    PartiallyCompleted,
    Failed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of plan work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique within the owning plan
    pub id: String,

    /// Kind of work
    pub kind: TaskKind,

    /// Instruction for the executor
    pub description: String,

    /// Priority (drives recovery eligibility and deadlock tie-breaks)
    pub priority: Priority,

    /// Ids of tasks that must be completed first
    pub dependencies: Vec<String>,

    /// Current status
    pub status: TaskStatus,

    /// Set when the task enters IN_PROGRESS
    pub started_at: Option<DateTime<Utc>>,

    /// Set when the task leaves IN_PROGRESS
    pub ended_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task with no dependencies.
    pub fn new(id: impl Into<String>, kind: TaskKind, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            description: description.into(),
            priority: Priority::Medium,
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Return a finished-but-not-completed task to PENDING for another run.
    pub fn reset(&mut self) {
        self.status = TaskStatus::Pending;
        self.started_at = None;
        self.ended_at = None;
    }
}

/// Outcome of executing or recovering a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the task succeeded
    pub success: bool,

    /// Human-readable outcome or error
    pub message: String,

    /// File paths touched
    pub artifacts: Vec<String>,

    /// Handles issued by the operation handler
    pub operation_ids: Vec<String>,
}

impl TaskResult {
    /// A failed result carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            artifacts: Vec::new(),
            operation_ids: Vec::new(),
        }
    }
}

/// The structured decomposition of one user request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,

    /// Short summary of intent
    pub main_goal: String,

    /// Verbatim input request
    pub original_request: String,

    /// Tasks in synthesis order (not execution order)
    pub tasks: Vec<Task>,

    /// Literal paths or glob patterns used as grounding context
    pub context_patterns: Vec<String>,

    /// Advisory risk notes
    pub risks: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub status: PlanStatus,

    /// At most one result per task id
    pub results: HashMap<String, TaskResult>,
}

impl Plan {
    /// Create an empty pending plan with a fresh id.
    pub fn new(main_goal: impl Into<String>, original_request: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            main_goal: main_goal.into(),
            original_request: original_request.into(),
            tasks: Vec::new(),
            context_patterns: Vec::new(),
            risks: Vec::new(),
            created_at: Utc::now(),
            status: PlanStatus::Pending,
            results: HashMap::new(),
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Whether the given task id names a completed task in this plan.
    pub fn is_task_completed(&self, id: &str) -> bool {
        self.task(id).is_some_and(Task::is_completed)
    }

    /// Get progress as (completed, total).
    pub fn progress(&self) -> (usize, usize) {
        let completed = self.tasks.iter().filter(|t| t.is_completed()).count();
        (completed, self.tasks.len())
    }

    /// Check if every task is completed.
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(Task::is_completed)
    }

    /// Render the plan as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# {}\n\n", self.main_goal);
        md.push_str(&format!("**Plan:** {}\n", self.id));
        md.push_str(&format!("**Status:** {}\n\n", self.status));

        for task in &self.tasks {
            md.push_str(&format!("## Task {}: {}\n\n", task.id, task.description));
            md.push_str(&format!("**Type:** {}\n", task.kind));
            md.push_str(&format!("**Priority:** {}\n", task.priority));
            md.push_str(&format!("**Status:** {}\n", task.status.as_str()));
            if !task.dependencies.is_empty() {
                md.push_str(&format!("**Depends on:** {}\n", task.dependencies.join(", ")));
            }
            md.push('\n');
        }

        if !self.context_patterns.is_empty() {
            md.push_str("## Context\n\n");
            for pattern in &self.context_patterns {
                md.push_str(&format!("- `{pattern}`\n"));
            }
            md.push('\n');
        }

        if !self.risks.is_empty() {
            md.push_str("## Risks\n\n");
            for risk in &self.risks {
                md.push_str(&format!("- {risk}\n"));
            }
            md.push('\n');
        }

        md
    }
}
