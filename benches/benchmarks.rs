//! Performance benchmarks for Planrun.
//!
//! This module contains benchmarks for:
//! - Dependency resolution on chains, wide fan-outs and cycles
//! - Plan response parsing
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use planrun::workflow::{parse_plan_response, resolve_order};
use planrun::{Priority, Task, TaskKind};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    fn priority(i: usize) -> Priority {
        match i % 3 {
            0 => Priority::High,
            1 => Priority::Medium,
            _ => Priority::Low,
        }
    }

    /// Each task depends on the previous one, declared in reverse order.
    pub fn chain(count: usize) -> Vec<Task> {
        (0..count)
            .rev()
            .map(|i| {
                let task = Task::new(format!("t{i}"), TaskKind::CodeModification, format!("step {i}"))
                    .with_priority(priority(i));
                if i == 0 {
                    task
                } else {
                    task.with_dependencies([format!("t{}", i - 1)])
                }
            })
            .collect()
    }

    /// One root task with every other task depending on it.
    pub fn fan_out(count: usize) -> Vec<Task> {
        (0..count)
            .map(|i| {
                let task = Task::new(format!("t{i}"), TaskKind::CodeAnalysis, format!("leaf {i}"))
                    .with_priority(priority(i));
                if i == 0 {
                    task
                } else {
                    task.with_dependencies(["t0"])
                }
            })
            .collect()
    }

    /// A ring where every task depends on the next one.
    pub fn ring(count: usize) -> Vec<Task> {
        (0..count)
            .map(|i| {
                Task::new(format!("t{i}"), TaskKind::Refactoring, format!("ring {i}"))
                    .with_priority(priority(i))
                    .with_dependencies([format!("t{}", (i + 1) % count)])
            })
            .collect()
    }

    /// A fenced plan response with `count` tasks.
    pub fn plan_response(count: usize) -> String {
        let tasks: Vec<String> = (0..count)
            .map(|i| {
                let deps = if i == 0 { String::new() } else { format!("\"t{}\"", i - 1) };
                format!(
                    r#"{{"id": "t{i}", "type": "code_modification", "description": "step {i}", "priority": "medium", "dependencies": [{deps}]}}"#
                )
            })
            .collect();
        format!(
            "Here is the plan:\n\n```json\n{{\"mainGoal\": \"bench\", \"tasks\": [{}], \"contextFiles\": [\"src/**/*.rs\"]}}\n```\n",
            tasks.join(", ")
        )
    }
}

// ============================================================================
// Resolver Benchmarks
// ============================================================================

fn bench_resolve_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver/order");

    for size in [10, 50, 200].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        let chain = fixtures::chain(*size);
        group.bench_with_input(BenchmarkId::new("chain", size), &chain, |b, tasks| {
            b.iter(|| resolve_order(black_box(tasks)));
        });

        let fan_out = fixtures::fan_out(*size);
        group.bench_with_input(BenchmarkId::new("fan_out", size), &fan_out, |b, tasks| {
            b.iter(|| resolve_order(black_box(tasks)));
        });

        let ring = fixtures::ring(*size);
        group.bench_with_input(BenchmarkId::new("ring", size), &ring, |b, tasks| {
            b.iter(|| resolve_order(black_box(tasks)));
        });
    }

    group.finish();
}

// ============================================================================
// Parsing Benchmarks
// ============================================================================

fn bench_plan_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("planning/parse");

    for size in [5, 25, 100].iter() {
        let response = fixtures::plan_response(*size);
        group.throughput(Throughput::Bytes(response.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &response, |b, text| {
            b.iter(|| parse_plan_response(black_box(text), "bench request"));
        });
    }

    group.finish();
}

criterion_group!(resolver_benches, bench_resolve_order,);
criterion_group!(parsing_benches, bench_plan_parsing,);
criterion_main!(resolver_benches, parsing_benches,);
