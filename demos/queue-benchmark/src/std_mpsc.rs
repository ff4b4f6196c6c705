use std::sync::mpsc;

use super::*;

pub fn bench(iters: usize, capacity: usize) -> Duration {
    let (tx, rx) = mpsc::sync_channel(capacity);
    hand_off(
        move || {
            for _ in 0..iters {
                tx.send(make_item()).unwrap();
            }
        },
        move || {
            let mut n = 0;
            while let Ok(i) = rx.recv() {
                black_box(i);
                n += 1;
            }
            assert_eq!(n, iters);
        },
    )
}
