//! Dependency-aware task ordering.
//!
//! Repeatedly scans the pending tasks and moves every task whose dependencies
//! are already resolved. When a full scan makes no progress (a cycle, or a
//! dependency on an id that is not in the list) the highest-priority pending
//! task is forced through, ties broken by original order, and scanning
//! resumes. This never fails and is O(n²) in the worst case.

use std::collections::HashSet;

use super::model::Task;

/// Order tasks so each appears after its dependencies where possible.
///
/// Returns indices into `tasks`; every index appears exactly once.
pub fn resolve_order(tasks: &[Task]) -> Vec<usize> {
    let mut resolved: Vec<usize> = Vec::with_capacity(tasks.len());
    let mut resolved_ids: HashSet<&str> = HashSet::with_capacity(tasks.len());
    let mut pending: Vec<usize> = (0..tasks.len()).collect();

    while !pending.is_empty() {
        let before = pending.len();

        let mut i = 0;
        while i < pending.len() {
            let task = &tasks[pending[i]];
            if task.dependencies.iter().all(|dep| resolved_ids.contains(dep.as_str())) {
                let index = pending.remove(i);
                resolved_ids.insert(tasks[index].id.as_str());
                resolved.push(index);
            } else {
                i += 1;
            }
        }

        if pending.len() == before {
            // Deadlock: `pending` stays in original order, so min_by_key keeps the first of equal rank.
            let Some(pos) = (0..pending.len()).min_by_key(|&p| tasks[pending[p]].priority.rank())
            else {
                break;
            };
            let index = pending.remove(pos);
            tracing::warn!(
                task = %tasks[index].id,
                remaining = pending.len(),
                "Unresolvable dependencies, forcing task by priority"
            );
            resolved_ids.insert(tasks[index].id.as_str());
            resolved.push(index);
        }
    }

    resolved
}

/// Convenience wrapper returning task ids in execution order.
pub fn resolve_ids(tasks: &[Task]) -> Vec<String> {
    resolve_order(tasks).into_iter().map(|i| tasks[i].id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{Priority, TaskKind};

    fn task(id: &str, deps: &[&str], priority: Priority) -> Task {
        Task::new(id, TaskKind::CodeModification, format!("task {id}"))
            .with_dependencies(deps.iter().copied())
            .with_priority(priority)
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn test_acyclic_order_respects_dependencies() {
        let tasks = vec![
            task("d", &["b", "c"], Priority::Low),
            task("b", &["a"], Priority::Medium),
            task("c", &["a"], Priority::High),
            task("a", &[], Priority::Low),
        ];

        let order = resolve_ids(&tasks);
        assert_eq!(order.len(), 4);
        for t in &tasks {
            for dep in &t.dependencies {
                assert!(position(&order, dep) < position(&order, &t.id));
            }
        }
    }

    #[test]
    fn test_independent_tasks_keep_original_order() {
        let tasks = vec![
            task("x", &[], Priority::Low),
            task("y", &[], Priority::High),
            task("z", &[], Priority::Medium),
        ];
        assert_eq!(resolve_ids(&tasks), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_two_task_cycle_breaks_by_priority() {
        let tasks = vec![task("a", &["b"], Priority::Low), task("b", &["a"], Priority::High)];
        assert_eq!(resolve_ids(&tasks), vec!["b", "a"]);
    }

    #[test]
    fn test_cycle_tie_breaks_by_original_order() {
        let tasks = vec![task("a", &["b"], Priority::Medium), task("b", &["a"], Priority::Medium)];
        assert_eq!(resolve_ids(&tasks), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_dependency_is_forced() {
        let tasks = vec![task("a", &["ghost"], Priority::High), task("b", &["a"], Priority::Low)];
        assert_eq!(resolve_ids(&tasks), vec!["a", "b"]);
    }

    #[test]
    fn test_cycle_with_downstream_tasks() {
        let tasks = vec![
            task("tail", &["c"], Priority::Low),
            task("a", &["c"], Priority::Medium),
            task("b", &["a"], Priority::Low),
            task("c", &["b"], Priority::Low),
            task("free", &[], Priority::Low),
        ];

        let order = resolve_ids(&tasks);
        assert_eq!(order.len(), tasks.len());
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), tasks.len());
        // Free task resolves in the first scan; the forced break picks "a" (medium beats low).
        assert_eq!(order[0], "free");
        assert_eq!(order[1], "a");
        assert!(position(&order, "c") < position(&order, "tail"));
    }

    #[test]
    fn test_unknown_priority_sorts_last() {
        let tasks = vec![
            task("a", &["b"], Priority::Unknown("urgent".to_string())),
            task("b", &["a"], Priority::Low),
        ];
        assert_eq!(resolve_ids(&tasks), vec!["b", "a"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_order(&[]).is_empty());
    }
}
