//! Execution summary for a finished plan.

use serde::{Deserialize, Serialize};

use super::model::{Plan, PlanStatus, TaskStatus};

/// A task left failed at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    pub id: String,
    pub description: String,
    pub message: String,
}

/// Execution summary for a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// Plan ID
    pub plan_id: String,

    /// Plan goal
    pub main_goal: String,

    /// Final plan status
    pub status: PlanStatus,

    /// Total tasks
    pub total_tasks: usize,

    /// Completed tasks
    pub completed: usize,

    /// Failed tasks
    pub failed: usize,

    /// round(completed / total * 100); 0 for an empty plan
    pub percent: u32,

    /// Every touched path, in order of first appearance (duplicates kept)
    pub artifacts: Vec<String>,

    /// Tasks still failed
    pub failures: Vec<FailedTask>,

    /// Advisory risk notes from the plan
    pub risks: Vec<String>,
}

impl ExecutionSummary {
    /// Build the summary from a plan's final state.
    pub fn from_plan(plan: &Plan) -> Self {
        let (completed, total) = plan.progress();
        let percent = if total == 0 {
            0
        } else {
            (completed as f64 / total as f64 * 100.0).round() as u32
        };

        let artifacts = plan
            .tasks
            .iter()
            .filter_map(|task| plan.results.get(&task.id))
            .flat_map(|result| result.artifacts.iter().cloned())
            .collect();

        let failures: Vec<FailedTask> = plan
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Failed)
            .map(|task| FailedTask {
                id: task.id.clone(),
                description: task.description.clone(),
                message: plan
                    .results
                    .get(&task.id)
                    .map(|r| r.message.clone())
                    .unwrap_or_else(|| "No result recorded".to_string()),
            })
            .collect();

        Self {
            plan_id: plan.id.clone(),
            main_goal: plan.main_goal.clone(),
            status: plan.status,
            total_tasks: total,
            completed,
            failed: failures.len(),
            percent,
            artifacts,
            failures,
            risks: plan.risks.clone(),
        }
    }

    /// Check if execution was successful.
    pub fn is_successful(&self) -> bool {
        self.status == PlanStatus::Completed
    }

    /// Format as human-readable summary.
    pub fn to_summary_string(&self) -> String {
        let mut summary = format!("Execution Summary: {}\n", self.main_goal);
        summary.push_str(&format!("Status: {}\n", self.status));
        summary.push_str(&format!(
            "Tasks: {}/{} completed ({}%)\n",
            self.completed, self.total_tasks, self.percent
        ));

        if !self.artifacts.is_empty() {
            summary.push_str("\nFiles touched:\n");
            for path in &self.artifacts {
                summary.push_str(&format!("  - {path}\n"));
            }
        }

        if !self.failures.is_empty() {
            summary.push_str("\nFailed tasks:\n");
            for failure in &self.failures {
                summary.push_str(&format!(
                    "  ✗ {}: {}\n    Error: {}\n",
                    failure.id, failure.description, failure.message
                ));
            }
        }

        if !self.risks.is_empty() {
            summary.push_str("\nRisks:\n");
            for risk in &self.risks {
                summary.push_str(&format!("  - {risk}\n"));
            }
        }

        summary
    }
}

/// Render the text summary for a plan.
pub fn render_summary(plan: &Plan) -> String {
    ExecutionSummary::from_plan(plan).to_summary_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{Task, TaskKind, TaskResult};

    fn plan_with(statuses: &[TaskStatus]) -> Plan {
        let tasks = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut task = Task::new(format!("t{i}"), TaskKind::CodeModification, format!("Do {i}"));
                task.status = *status;
                task
            })
            .collect();
        Plan::new("Goal", "request").with_tasks(tasks)
    }

    #[test]
    fn test_percent_rounding() {
        let mut plan = plan_with(&[TaskStatus::Completed, TaskStatus::Completed, TaskStatus::Failed]);
        plan.status = PlanStatus::PartiallyCompleted;

        let summary = ExecutionSummary::from_plan(&plan);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.percent, 67);
        assert!(!summary.is_successful());

        let text = summary.to_summary_string();
        assert!(text.contains("2/3 completed (67%)"));
        assert!(text.contains("partially completed"));
    }

    #[test]
    fn test_empty_plan_percent() {
        let summary = ExecutionSummary::from_plan(&plan_with(&[]));
        assert_eq!(summary.percent, 0);
    }

    #[test]
    fn test_failures_and_artifacts() {
        let mut plan = plan_with(&[TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Completed]);
        plan.results.insert(
            "t0".to_string(),
            TaskResult {
                success: true,
                message: "ok".to_string(),
                artifacts: vec!["a.rs".to_string(), "b.rs".to_string()],
                operation_ids: vec!["op1".to_string()],
            },
        );
        plan.results.insert("t1".to_string(), TaskResult::failure("Dependencies not met"));
        plan.results.insert(
            "t2".to_string(),
            TaskResult {
                success: true,
                message: "ok".to_string(),
                artifacts: vec!["a.rs".to_string()],
                operation_ids: vec!["op2".to_string()],
            },
        );

        let summary = ExecutionSummary::from_plan(&plan);
        assert_eq!(summary.artifacts, vec!["a.rs", "b.rs", "a.rs"]);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].description, "Do 1");
        assert_eq!(summary.failures[0].message, "Dependencies not met");

        let text = render_summary(&plan);
        assert!(text.contains("Do 1"));
        assert!(text.contains("Dependencies not met"));
        assert!(!text.contains("Do 0"));
    }

    #[test]
    fn test_summary_is_deterministic() {
        let plan = plan_with(&[TaskStatus::Completed, TaskStatus::Failed]);
        assert_eq!(render_summary(&plan), render_summary(&plan));
    }
}
