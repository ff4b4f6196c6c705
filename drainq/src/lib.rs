//! A closable FIFO queue for handing items from producers to consumers, and
//! a [`Driver`] that runs one producer thread against one consumer thread.
//!
//! Consumers never poll: [`ConcurrentQueue::dequeue`] sleeps until an item
//! arrives, the queue is closed and drained, or a timeout elapses.

mod error;
pub use error::{DequeueError, EnqueueError, TryDequeueError, TryEnqueueError};

mod queue;
pub use queue::{ConcurrentQueue, QueueState};

mod driver;
pub use driver::{Driver, DriverError, Role, Summary, TaskError, TaskErrorKind};

#[test]
fn hand_off() {
    use std::sync::Arc;

    let queue = Arc::new(ConcurrentQueue::new());
    let consumer = std::thread::spawn({
        let queue = queue.clone();
        move || {
            let mut served = vec![];
            while let Ok(order) = queue.dequeue(None) {
                println!("served: {order}");
                served.push(order);
            }
            served
        }
    });
    for order in ["pizza", "samosa", "pasta"] {
        println!("placed: {order}");
        queue.enqueue(order).unwrap();
    }
    queue.close();

    assert_eq!(consumer.join().unwrap(), ["pizza", "samosa", "pasta"]);
    assert_eq!(queue.state(), QueueState::Done);
}
