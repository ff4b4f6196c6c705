use tokio::sync::mpsc;

use super::*;

pub fn bench(iters: usize, capacity: usize) -> Duration {
    let (tx, mut rx) = mpsc::channel(capacity);
    hand_off(
        move || {
            for _ in 0..iters {
                tx.blocking_send(make_item()).unwrap();
            }
        },
        move || {
            let mut n = 0;
            while let Some(i) = rx.blocking_recv() {
                black_box(i);
                n += 1;
            }
            assert_eq!(n, iters);
        },
    )
}
