use std::num::NonZeroUsize;

use ::drainq::ConcurrentQueue;

use super::*;

pub fn bench(iters: usize, capacity: usize) -> Duration {
    let capacity = NonZeroUsize::new(capacity).expect("capacity must not be zero");
    run(ConcurrentQueue::bounded(capacity), iters)
}

pub fn bench_unbounded(iters: usize) -> Duration {
    run(ConcurrentQueue::new(), iters)
}

fn run(q: ConcurrentQueue<u64>, iters: usize) -> Duration {
    hand_off(
        || {
            for _ in 0..iters {
                q.enqueue(make_item()).unwrap();
            }
            q.close();
        },
        || {
            let mut n = 0;
            while let Ok(i) = q.dequeue(None) {
                black_box(i);
                n += 1;
            }
            assert_eq!(n, iters);
        },
    )
}
