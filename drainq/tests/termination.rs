use std::collections::HashMap;
use std::time::Duration;

use drainq::{ConcurrentQueue, DequeueError, Driver, QueueState};

fn jitter() {
    match fastrand::u8(..4) {
        0 => std::thread::yield_now(),
        1 => std::thread::sleep(Duration::from_micros(fastrand::u64(0..200))),
        _ => {},
    }
}

#[test]
fn exactly_k_items_then_end_of_stream() {
    for _ in 0..50 {
        let k = fastrand::usize(0..64);
        let q = ConcurrentQueue::new();
        let (served, end) = std::thread::scope(|cx| {
            cx.spawn(|| {
                for i in 0..k {
                    jitter();
                    q.enqueue(i).unwrap();
                }
                jitter();
                q.close();
            });
            cx.spawn(|| {
                let mut served = vec![];
                loop {
                    jitter();
                    match q.dequeue(None) {
                        Ok(i) => served.push(i),
                        Err(e) => break (served, e),
                    }
                }
            })
            .join()
            .unwrap()
        });

        assert_eq!(served, (0..k).collect::<Vec<_>>());
        assert_eq!(end, DequeueError::ClosedAndEmpty);
        assert_eq!(q.state(), QueueState::Done);
        // The terminal state is permanent.
        assert_eq!(q.dequeue(Some(Duration::ZERO)), Err(DequeueError::ClosedAndEmpty));
    }
}

#[test]
fn no_lost_or_duplicated_items() {
    const PRODUCERS: u32 = 3;
    const CONSUMERS: usize = 4;

    let counts = (0..PRODUCERS)
        .map(|_| fastrand::usize(100..300))
        .collect::<Vec<_>>();
    let q = ConcurrentQueue::new();

    let served = std::thread::scope(|cx| {
        let producers = counts
            .iter()
            .enumerate()
            .map(|(p, &n)| {
                let q = &q;
                cx.spawn(move || {
                    for i in 0..n {
                        q.enqueue((p, i)).unwrap();
                        jitter();
                    }
                })
            })
            .collect::<Vec<_>>();
        let consumers = (0..CONSUMERS)
            .map(|_| {
                cx.spawn(|| {
                    let mut served = vec![];
                    while let Ok(item) = q.dequeue(None) {
                        served.push(item);
                    }
                    served
                })
            })
            .collect::<Vec<_>>();

        for p in producers {
            p.join().unwrap();
        }
        q.close();
        consumers
            .into_iter()
            .map(|c| c.join().unwrap())
            .collect::<Vec<_>>()
    });

    let mut seen = HashMap::new();
    for per_consumer in &served {
        // Each producer's items still come out in order within one consumer.
        let mut last = HashMap::new();
        for &(p, i) in per_consumer {
            if let Some(prev) = last.insert(p, i) {
                assert!(prev < i);
            }
            *seen.entry((p, i)).or_insert(0) += 1;
        }
    }
    let total = counts.iter().sum::<usize>();
    assert_eq!(seen.len(), total);
    assert!(seen.values().all(|&n| n == 1));
}

#[test]
fn driver_serves_orders_in_order() {
    let orders = ["pizza", "samosa", "pasta", "biryani", "burger"];
    let mut served = vec![];
    let summary = Driver::new()
        .produce_delay(Duration::from_millis(3))
        .consume_delay(Duration::from_millis(7))
        .consume_start_delay(Duration::from_millis(5))
        .dequeue_timeout(Some(Duration::from_secs(5)))
        .run(orders.map(String::from), |order| served.push(order))
        .unwrap();

    assert_eq!(served, orders);
    assert_eq!((summary.produced, summary.consumed), (5, 5));
}
