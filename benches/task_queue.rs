//! Benchmarks for the sqlite-backed task queue: planning throughput and
//! claim contention under a growing worker pool, the two hot paths a
//! live swarm spends most of its time in.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;
use uuid::Uuid;

use conclave::adapters::sqlite::{create_migrated_test_pool, SqliteTaskStore};
use conclave::domain::models::{TaskComplexity, TaskDraft};
use conclave::domain::ports::TaskStore;

fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        cycle_id: None,
        title: title.to_string(),
        description: "bench task".to_string(),
        affected_files: vec![],
        acceptance_criteria: vec!["n/a".to_string()],
        priority: 5,
        complexity: TaskComplexity::Low,
        tags: vec![],
        deadline: None,
        creator_agent_id: Uuid::new_v4(),
        max_attempts: 3,
    }
}

fn bench_task_creation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = rt.block_on(async { SqliteTaskStore::new(create_migrated_test_pool().await.unwrap()) });

    c.bench_function("task_creation", |b| {
        b.to_async(&rt).iter(|| async { store.create(draft("bench")).await.unwrap() });
    });
}

/// Claim throughput as the pending queue drains: each iteration claims
/// the single highest-priority pending task, mirroring what a Worker's
/// poll loop does every tick.
fn bench_claim_next_task(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("claim_next_task");
    for queue_depth in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(queue_depth), &queue_depth, |b, &queue_depth| {
            b.to_async(&rt).iter_batched(
                || {
                    rt.block_on(async {
                        let store = SqliteTaskStore::new(create_migrated_test_pool().await.unwrap());
                        for i in 0..queue_depth {
                            store.create(draft(&format!("queued-{i}"))).await.unwrap();
                        }
                        store
                    })
                },
                |store| async move {
                    store.claim_next_task(Uuid::new_v4()).await.unwrap();
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Claim races under contention: `worker_count` workers call
/// `claim_next_task` concurrently against a single pending task, the
/// shape P1's "exactly one winner" guarantee has to hold up under.
fn bench_concurrent_claim_race(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent_claim_race");
    for worker_count in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(worker_count), &worker_count, |b, &worker_count| {
            b.to_async(&rt).iter_batched(
                || {
                    rt.block_on(async {
                        let store = std::sync::Arc::new(SqliteTaskStore::new(create_migrated_test_pool().await.unwrap()));
                        store.create(draft("contested")).await.unwrap();
                        store
                    })
                },
                |store| async move {
                    let handles: Vec<_> = (0..worker_count)
                        .map(|_| {
                            let store = std::sync::Arc::clone(&store);
                            tokio::spawn(async move { store.claim_next_task(Uuid::new_v4()).await.unwrap() })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap();
                    }
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_task_creation, bench_claim_next_task, bench_concurrent_claim_race);
criterion_main!(benches);
