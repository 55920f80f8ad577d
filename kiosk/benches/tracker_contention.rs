use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use kiosk::{
    AdvanceResponse, CompletionTracker, LoadTestConfig, StartedWorkflow, WorkflowGateway,
    run_load_test,
};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct InstantGateway;

#[async_trait]
impl WorkflowGateway for InstantGateway {
    async fn start_workflow(&self, sequence: u64) -> anyhow::Result<StartedWorkflow> {
        Ok(StartedWorkflow {
            status: 200,
            workflow_id: format!("bench-{sequence}"),
            reached_yield_point: true,
        })
    }

    async fn advance_workflow(
        &self,
        _workflow_id: &str,
        _action: &str,
    ) -> anyhow::Result<AdvanceResponse> {
        Ok(AdvanceResponse { status: 204 })
    }
}

fn benchmark_submit_complete(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_submit_complete");
    group.throughput(Throughput::Elements(1));
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("single_thread", |b| {
        let tracker = Arc::new(CompletionTracker::new());
        b.iter(|| {
            let guard = tracker.on_submit();
            guard.complete(black_box(&Ok(())));
        });
    });

    group.bench_function("snapshot", |b| {
        let tracker = Arc::new(CompletionTracker::new());
        let _held: Vec<_> = (0..100).map(|_| tracker.on_submit()).collect();
        b.iter(|| black_box(tracker.snapshot()));
    });

    group.finish();
}

fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker_contention");
    group.measurement_time(Duration::from_secs(5));

    const OPS_PER_THREAD: u64 = 10_000;

    for threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(threads * OPS_PER_THREAD));
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &threads| {
                b.iter(|| {
                    let tracker = Arc::new(CompletionTracker::new());
                    let workers: Vec<_> = (0..threads)
                        .map(|_| {
                            let tracker = Arc::clone(&tracker);
                            thread::spawn(move || {
                                for _ in 0..OPS_PER_THREAD {
                                    let guard = tracker.on_submit();
                                    guard.complete(&Ok(()));
                                }
                            })
                        })
                        .collect();

                    for worker in workers {
                        worker.join().unwrap();
                    }
                    black_box(tracker.snapshot())
                });
            },
        );
    }

    group.finish();
}

fn benchmark_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch");
    group.sample_size(10);

    // Rates above 1000/s pace with a zero interval, so this measures the
    // dispatch and drain overhead alone.
    group.bench_function("burst_2000", |b| {
        b.to_async(&runtime).iter(|| async {
            let mut config = LoadTestConfig::new(2_000, Some(1));
            config.drain_poll_interval = Duration::from_millis(1);
            black_box(run_load_test(config, Arc::new(InstantGateway)).await)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_submit_complete,
    benchmark_contention,
    benchmark_dispatch
);
criterion_main!(benches);
