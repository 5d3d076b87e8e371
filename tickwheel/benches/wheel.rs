use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use tickwheel::{Clock, DispatchMode, ManualClock, TickerMode, Wheel, WheelConfig};

// ==================== Helpers ====================

fn bench_wheel(slots: usize) -> Wheel {
    let config = WheelConfig::new(slots, Duration::from_millis(1))
        .with_ticker(TickerMode::Manual)
        .with_dispatch(DispatchMode::Inline)
        .with_clock(Arc::new(ManualClock::new()) as Arc<dyn Clock>);
    Wheel::with_config(config).unwrap()
}

// ==================== Schedule / Cancel ====================

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");

    group.bench_function("schedule_cancel", |b| {
        let wheel = bench_wheel(512);
        b.iter(|| {
            wheel
                .schedule_after("k", || {}, Duration::from_millis(100))
                .unwrap();
            black_box(wheel.cancel("k"))
        });
    });

    for resident in [0usize, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("schedule_cancel_with_resident", resident),
            &resident,
            |b, &resident| {
                let wheel = bench_wheel(512);
                for i in 0..resident {
                    let delay = Duration::from_millis((i % 5_000) as u64);
                    wheel.schedule_after(format!("r{i}"), || {}, delay).unwrap();
                }
                b.iter(|| {
                    wheel
                        .schedule_after("k", || {}, Duration::from_millis(250))
                        .unwrap();
                    black_box(wheel.cancel("k"))
                });
            },
        );
    }

    group.finish();
}

// ==================== Tick ====================

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");

    group.bench_function("empty", |b| {
        let wheel = bench_wheel(512);
        b.iter(|| black_box(wheel.tick()));
    });

    // Every slot holds entries with laps to spend; none mature.
    group.bench_function("pending_laps", |b| {
        let wheel = bench_wheel(64);
        for i in 0..6_400u64 {
            let delay = Duration::from_millis(1_000_000_000 + i);
            wheel.schedule_after(format!("p{i}"), || {}, delay).unwrap();
        }
        b.iter(|| black_box(wheel.tick()));
    });

    for burst in [1usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("mature_burst", burst), &burst, |b, &burst| {
            let wheel = bench_wheel(512);
            b.iter(|| {
                for i in 0..burst {
                    wheel
                        .schedule_after(format!("b{i}"), || {}, Duration::ZERO)
                        .unwrap();
                }
                black_box(wheel.tick())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_schedule, bench_tick);
criterion_main!(benches);
