use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Duration;

use crate::error::{DequeueError, EnqueueError};
use crate::queue::ConcurrentQueue;

/// Runs one producer thread and one consumer thread over a shared
/// [`ConcurrentQueue`].
///
/// The producer enqueues the supplied items in order and closes the queue
/// when it stops, however it stops. The consumer drains the queue until it
/// is closed and empty. Delays are simulation knobs only; the hand-off
/// itself never polls.
#[derive(Clone, Debug, Default)]
pub struct Driver {
    produce_delay: Duration,
    consume_delay: Duration,
    consume_start_delay: Duration,
    dequeue_timeout: Option<Duration>,
    capacity: Option<NonZeroUsize>,
}

/// Counts reported by a successful [`Driver::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub produced: usize,
    pub consumed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskErrorKind {
    #[error("enqueue on a closed queue")]
    Closed,
    #[error("no item arrived within {0:?}")]
    Timeout(Duration),
    #[error("queue lock poisoned")]
    Poisoned,
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("failed to spawn thread: {0}")]
    Spawn(std::io::Error),
}

/// Fatal failure of one task.
#[derive(Debug, thiserror::Error)]
#[error("{role} failed: {kind}")]
pub struct TaskError {
    pub role: Role,
    pub kind: TaskErrorKind,
}

/// Every task failure of a [`Driver::run`], the consumer's first.
#[derive(Debug, thiserror::Error)]
#[error("{}", join_failures(.failures))]
pub struct DriverError {
    pub failures: Vec<TaskError>,
}

fn join_failures(failures: &[TaskError]) -> String {
    failures
        .iter()
        .map(TaskError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Closes the queue when dropped, including while unwinding.
struct CloseOnDrop<'a, T>(&'a ConcurrentQueue<T>);

impl<T> Drop for CloseOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl Driver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause between two enqueues.
    pub fn produce_delay(&mut self, delay: Duration) -> &mut Self {
        self.produce_delay = delay;
        self
    }

    /// Pause after each item is processed.
    pub fn consume_delay(&mut self, delay: Duration) -> &mut Self {
        self.consume_delay = delay;
        self
    }

    /// Pause before the consumer takes its first item.
    pub fn consume_start_delay(&mut self, delay: Duration) -> &mut Self {
        self.consume_start_delay = delay;
        self
    }

    /// Longest time the consumer waits for the next item. Running out of
    /// time is fatal to the consumer.
    pub fn dequeue_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.dequeue_timeout = timeout;
        self
    }

    /// Bounds the queue, making the producer wait for the consumer.
    pub fn capacity(&mut self, capacity: Option<NonZeroUsize>) -> &mut Self {
        self.capacity = capacity;
        self
    }

    /// Feeds `items` through a fresh queue, handing each one to `consume`
    /// on the consumer thread, and waits for both tasks to finish.
    pub fn run<T, I, F>(&self, items: I, mut consume: F) -> Result<Summary, DriverError>
    where
        T: Send + fmt::Debug,
        I: IntoIterator<Item = T>,
        I::IntoIter: Send,
        F: FnMut(T) + Send,
    {
        let queue = ConcurrentQueue::with_capacity(self.capacity);
        let items = items.into_iter();
        tracing::debug!("started driver, capacity={:?}", self.capacity);

        let (consumed, produced) = thread::scope(|cx| -> Result<_, DriverError> {
            let producer = spawn(cx, Role::Producer, || self.produce(&queue, items))
                .map_err(|e| DriverError { failures: vec![e] })?;
            let consumer = spawn(cx, Role::Consumer, || self.consume(&queue, &mut consume));
            let consumed = match consumer {
                Ok(consumer) => join(Role::Consumer, consumer),
                Err(e) => {
                    // Nobody is left to drain the queue.
                    queue.close();
                    Err(e)
                },
            };
            Ok((consumed, join(Role::Producer, producer)))
        })?;

        match (consumed, produced) {
            (Ok(consumed), Ok(produced)) => {
                tracing::debug!("finished driver, produced={produced}, consumed={consumed}");
                Ok(Summary { produced, consumed })
            },
            (consumed, produced) => Err(DriverError {
                failures: [consumed.err(), produced.err()]
                    .into_iter()
                    .flatten()
                    .inspect(|e| tracing::error!("{e}"))
                    .collect(),
            }),
        }
    }

    fn produce<T, I>(&self, queue: &ConcurrentQueue<T>, items: I) -> Result<usize, TaskErrorKind>
    where
        T: fmt::Debug,
        I: Iterator<Item = T>,
    {
        let _guard = CloseOnDrop(queue);
        let mut produced = 0;
        for item in items {
            if produced != 0 {
                thread::sleep(self.produce_delay);
            }
            let repr = format!("{item:?}");
            queue.enqueue(item).map_err(|e| match e {
                EnqueueError::Closed(_) => TaskErrorKind::Closed,
                EnqueueError::Poisoned(_) => TaskErrorKind::Poisoned,
            })?;
            tracing::info!("enqueued item, item={repr}");
            produced += 1;
        }
        tracing::debug!("exited producer, produced={produced}");
        Ok(produced)
    }

    fn consume<T, F>(
        &self,
        queue: &ConcurrentQueue<T>,
        consume: &mut F,
    ) -> Result<usize, TaskErrorKind>
    where
        T: fmt::Debug,
        F: FnMut(T),
    {
        // A failed consumer releases a producer blocked on a full queue.
        let _guard = CloseOnDrop(queue);
        thread::sleep(self.consume_start_delay);
        let mut consumed = 0;
        loop {
            match queue.dequeue(self.dequeue_timeout) {
                Ok(item) => {
                    tracing::info!("dequeued item, item={item:?}");
                    consume(item);
                    consumed += 1;
                    thread::sleep(self.consume_delay);
                },
                Err(DequeueError::ClosedAndEmpty) => break,
                Err(DequeueError::Timeout) => {
                    let timeout = self.dequeue_timeout.unwrap_or_default();
                    tracing::warn!("timed out waiting for an item, timeout={timeout:?}");
                    return Err(TaskErrorKind::Timeout(timeout));
                },
                Err(DequeueError::Poisoned) => return Err(TaskErrorKind::Poisoned),
            }
        }
        tracing::debug!("exited consumer, consumed={consumed}");
        Ok(consumed)
    }
}

fn spawn<'scope, 'env, F>(
    cx: &'scope Scope<'scope, 'env>,
    role: Role,
    f: F,
) -> Result<ScopedJoinHandle<'scope, Result<usize, TaskErrorKind>>, TaskError>
where
    F: 'scope + Send + FnOnce() -> Result<usize, TaskErrorKind>,
{
    thread::Builder::new()
        .name(role.to_string())
        .spawn_scoped(cx, f)
        .map_err(|e| TaskError {
            role,
            kind: TaskErrorKind::Spawn(e),
        })
}

fn join(
    role: Role,
    handle: ScopedJoinHandle<'_, Result<usize, TaskErrorKind>>,
) -> Result<usize, TaskError> {
    handle
        .join()
        .unwrap_or_else(|payload| Err(TaskErrorKind::Panicked(panic_message(&*payload))))
        .map_err(|kind| TaskError { role, kind })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [&str; 5] = ["pizza", "samosa", "pasta", "biryani", "burger"];

    #[test]
    fn serve_all_orders() {
        let mut served = vec![];
        let summary = Driver::new()
            .produce_delay(Duration::from_millis(5))
            .consume_delay(Duration::from_millis(10))
            .run(ORDERS, |order| served.push(order))
            .unwrap();

        assert_eq!(served, ORDERS);
        assert_eq!(summary, Summary {
            produced: 5,
            consumed: 5,
        });
    }

    #[test]
    fn no_items() {
        let summary = Driver::new()
            .run(std::iter::empty::<u32>(), |_| unreachable!())
            .unwrap();
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn late_consumer_still_drains() {
        let input = std::iter::repeat_with(|| fastrand::u16(..))
            .take(20)
            .collect::<Vec<_>>();

        let mut served = vec![];
        Driver::new()
            .produce_delay(Duration::from_millis(2))
            .consume_start_delay(Duration::from_millis(15))
            .run(input.iter().copied(), |i| served.push(i))
            .unwrap();
        assert_eq!(served, input);
    }

    #[test]
    fn bounded_queue_applies_backpressure() {
        let input = (0..50).collect::<Vec<_>>();
        let mut served = vec![];
        let summary = Driver::new()
            .capacity(NonZeroUsize::new(2))
            .consume_delay(Duration::from_millis(1))
            .run(input.clone(), |i| served.push(i))
            .unwrap();
        assert_eq!(served, input);
        assert_eq!(summary.consumed, 50);
    }

    #[test]
    fn consumer_times_out() {
        let err = Driver::new()
            .produce_delay(Duration::from_millis(300))
            .dequeue_timeout(Some(Duration::from_millis(20)))
            .run(ORDERS, drop)
            .unwrap_err();

        let first = &err.failures[0];
        assert_eq!(first.role, Role::Consumer);
        assert!(matches!(first.kind, TaskErrorKind::Timeout(t) if t == Duration::from_millis(20)));
        // The early close aborts the producer as well.
        assert!(err.failures.iter().any(|e| e.role == Role::Producer
            && matches!(e.kind, TaskErrorKind::Closed)));
        assert!(err.to_string().starts_with("consumer failed: no item arrived"));
    }

    #[test]
    fn consumer_panic_releases_producer() {
        let err = Driver::new()
            .capacity(NonZeroUsize::new(1))
            .run(0..100, |i| {
                if i == 3 {
                    panic!("bad item {i}");
                }
            })
            .unwrap_err();

        let first = &err.failures[0];
        assert_eq!(first.role, Role::Consumer);
        assert!(matches!(&first.kind, TaskErrorKind::Panicked(m) if m == "bad item 3"));
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.failures[1].role, Role::Producer);
    }

    #[test]
    fn producer_panic_still_closes() {
        let items = (0..5).map(|i| {
            if i == 3 {
                panic!("ran out of ingredients");
            }
            i
        });

        let mut served = vec![];
        let err = Driver::new().run(items, |i| served.push(i)).unwrap_err();

        assert_eq!(served, [0, 1, 2]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].role, Role::Producer);
        assert!(matches!(
            &err.failures[0].kind,
            TaskErrorKind::Panicked(m) if m == "ran out of ingredients"
        ));
    }
}
