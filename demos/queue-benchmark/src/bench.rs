mod drainq;
mod std_mpsc;
mod tokio_mpsc;

use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};

const CAPACITIES: &[usize] = &[1, 16, 256, 4096];

type BenchFn = fn(usize, usize) -> Duration;

/// Returns an arbitrary item, black boxed to mock runtime values.
fn make_item() -> u64 {
    black_box(fastrand::u64(..))
}

/// Runs `produce` and `consume` on two threads and measures the time until
/// both have returned.
fn hand_off(produce: impl Send + FnOnce(), consume: impl Send + FnOnce()) -> Duration {
    let now = Instant::now();
    std::thread::scope(|cx| {
        cx.spawn(produce);
        cx.spawn(consume);
    });
    now.elapsed()
}

fn groups(c: &mut Criterion) {
    macro_rules! benches {
        ($($name:ident),* $(,)?) => ([$((stringify!($name), self::$name::bench as BenchFn),)*]);
    }

    let mut g = c.benchmark_group("queue_benchmark");
    for (i, capacity) in CAPACITIES.iter().copied().enumerate() {
        for (name, f) in benches![drainq, std_mpsc, tokio_mpsc] {
            let id = format!("queue_benchmark_{i:02}_cap{capacity}_{name}");
            g.bench_function(&id, |b| b.iter_custom(|iters| f(iters as usize, capacity)));
        }
    }
    g.bench_function("queue_benchmark_unbounded_drainq", |b| {
        b.iter_custom(|iters| drainq::bench_unbounded(iters as usize))
    });
}

criterion_group!(
    name = queue_benchmark;
    config = Criterion::default().sample_size(50).measurement_time(Duration::from_secs(10));
    targets = groups
);
criterion_main!(queue_benchmark);
