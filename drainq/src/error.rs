use std::fmt;

/// Failure of [`enqueue`](crate::ConcurrentQueue::enqueue).
///
/// The rejected item is always handed back to the caller.
#[derive(thiserror::Error)]
pub enum EnqueueError<T> {
    /// The queue was closed before the item could be added.
    #[error("enqueue on a closed queue")]
    Closed(T),
    /// A thread panicked while holding the queue lock.
    #[error("queue lock poisoned")]
    Poisoned(T),
}

/// Failure of [`try_enqueue`](crate::ConcurrentQueue::try_enqueue).
#[derive(thiserror::Error)]
pub enum TryEnqueueError<T> {
    /// A bounded queue is at capacity.
    #[error("queue is full")]
    Full(T),
    #[error("enqueue on a closed queue")]
    Closed(T),
    #[error("queue lock poisoned")]
    Poisoned(T),
}

/// Failure of [`dequeue`](crate::ConcurrentQueue::dequeue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DequeueError {
    /// The queue is closed and drained. This is the normal end of stream.
    #[error("queue is closed and empty")]
    ClosedAndEmpty,
    /// The deadline elapsed while the queue was open and empty.
    #[error("timed out waiting for an item")]
    Timeout,
    #[error("queue lock poisoned")]
    Poisoned,
}

/// Failure of [`try_dequeue`](crate::ConcurrentQueue::try_dequeue).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TryDequeueError {
    /// Nothing to take right now, but more items may arrive.
    #[error("queue is empty")]
    Empty,
    #[error("queue is closed and empty")]
    ClosedAndEmpty,
    #[error("queue lock poisoned")]
    Poisoned,
}

impl<T> EnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(item) | Self::Poisoned(item) => item,
        }
    }
}

impl<T> TryEnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) | Self::Poisoned(item) => item,
        }
    }
}

// Items need not be `Debug`, so the payload is elided like `std::sync::mpsc::SendError`.
impl<T> fmt::Debug for EnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.write_str("Closed(..)"),
            Self::Poisoned(_) => f.write_str("Poisoned(..)"),
        }
    }
}

impl<T> fmt::Debug for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
            Self::Poisoned(_) => f.write_str("Poisoned(..)"),
        }
    }
}
