use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempo_scheduler::{Priority, Scheduler, TaskOutcome, VirtualHost};

fn benchmark_submit_and_drain(c: &mut Criterion) {
    c.bench_function("schedule_and_drain 1000", |b| {
        b.iter(|| {
            let host = VirtualHost::new();
            let scheduler = Scheduler::new(host.clone());
            for _ in 0..1000 {
                scheduler.schedule(Priority::Normal, |_| {
                    black_box(1 + 1);
                    TaskOutcome::Complete
                });
            }
            host.run_until_idle();
        })
    });
}

fn benchmark_mixed_priorities(c: &mut Criterion) {
    let priorities = [
        Priority::Immediate,
        Priority::UserBlocking,
        Priority::Normal,
        Priority::Low,
    ];
    c.bench_function("schedule_and_drain mixed 1000", |b| {
        b.iter(|| {
            let host = VirtualHost::new();
            let scheduler = Scheduler::new(host.clone());
            for i in 0..1000 {
                scheduler.schedule(priorities[i % priorities.len()], |_| {
                    black_box(1 + 1);
                    TaskOutcome::Complete
                });
            }
            host.run_until_idle();
        })
    });
}

criterion_group!(benches, benchmark_submit_and_drain, benchmark_mixed_priorities);
criterion_main!(benches);
