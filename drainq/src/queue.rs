use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{DequeueError, EnqueueError, TryDequeueError, TryEnqueueError};

/// A FIFO queue shared between producers and consumers.
///
/// All state lives behind one mutex. Consumers blocked in
/// [`dequeue`](Self::dequeue) sleep on a condition variable and are woken by
/// [`enqueue`](Self::enqueue) or [`close`](Self::close). Producers only block
/// when the queue is [`bounded`](Self::bounded) and full.
///
/// Once closed, no further item is accepted. A closed queue keeps serving the
/// items it already holds; when the last one is taken the queue reaches
/// [`QueueState::Done`] and stays there.
pub struct ConcurrentQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<NonZeroUsize>,
}

struct Inner<T> {
    buf: VecDeque<T>,
    closed: bool,
}

/// Lifecycle of a queue as seen by its consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueState {
    /// Open, possibly holding items.
    Running,
    /// Closed, some items are still waiting to be served.
    Draining,
    /// Closed and drained. No transition leaves this state.
    Done,
}

impl<T> Inner<T> {
    fn state(&self) -> QueueState {
        match (self.closed, self.buf.is_empty()) {
            (false, _) => QueueState::Running,
            (true, false) => QueueState::Draining,
            (true, true) => QueueState::Done,
        }
    }
}

impl<T> ConcurrentQueue<T> {
    /// Creates an open queue without a capacity limit.
    pub const fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Creates an open queue holding at most `capacity` items.
    ///
    /// [`enqueue`](Self::enqueue) blocks while the queue is full.
    pub const fn bounded(capacity: NonZeroUsize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub const fn with_capacity(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    fn is_full(&self, inner: &Inner<T>) -> bool {
        self.capacity.is_some_and(|cap| inner.buf.len() >= cap.get())
    }

    /// Appends an item to the tail.
    ///
    /// On a bounded queue this waits for a free slot. Fails with
    /// [`EnqueueError::Closed`] if the queue is (or becomes, while waiting)
    /// closed, leaving its contents untouched.
    pub fn enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let Ok(mut inner) = self.inner.lock() else {
            return Err(EnqueueError::Poisoned(item));
        };
        while !inner.closed && self.is_full(&inner) {
            inner = match self.not_full.wait(inner) {
                Ok(inner) => inner,
                Err(_) => return Err(EnqueueError::Poisoned(item)),
            };
        }
        if inner.closed {
            return Err(EnqueueError::Closed(item));
        }
        inner.buf.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Appends an item to the tail without waiting for a free slot.
    pub fn try_enqueue(&self, item: T) -> Result<(), TryEnqueueError<T>> {
        let Ok(mut inner) = self.inner.lock() else {
            return Err(TryEnqueueError::Poisoned(item));
        };
        if inner.closed {
            return Err(TryEnqueueError::Closed(item));
        }
        if self.is_full(&inner) {
            return Err(TryEnqueueError::Full(item));
        }
        inner.buf.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the head item if there is one. Never blocks.
    pub fn try_dequeue(&self) -> Result<T, TryDequeueError> {
        let mut inner = self.inner.lock().map_err(|_| TryDequeueError::Poisoned)?;
        match self.pop(&mut inner) {
            Some(item) => Ok(item),
            None if inner.closed => Err(TryDequeueError::ClosedAndEmpty),
            None => Err(TryDequeueError::Empty),
        }
    }

    /// Removes the head item, waiting until one arrives.
    ///
    /// Returns [`DequeueError::ClosedAndEmpty`] once the queue is closed and
    /// drained, and [`DequeueError::Timeout`] if `timeout` elapses while the
    /// queue is still open and empty. `None` waits without limit.
    pub fn dequeue(&self, timeout: Option<Duration>) -> Result<T, DequeueError> {
        // A timeout too large to represent is the same as no timeout.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        self.wait_pop(deadline)
    }

    /// Like [`dequeue`](Self::dequeue), but gives up at an absolute deadline.
    pub fn dequeue_deadline(&self, deadline: Instant) -> Result<T, DequeueError> {
        self.wait_pop(Some(deadline))
    }

    fn wait_pop(&self, deadline: Option<Instant>) -> Result<T, DequeueError> {
        let mut inner = self.inner.lock().map_err(|_| DequeueError::Poisoned)?;
        loop {
            if let Some(item) = self.pop(&mut inner) {
                return Ok(item);
            }
            if inner.closed {
                return Err(DequeueError::ClosedAndEmpty);
            }
            // Wakeups may be spurious, so the state is always re-checked.
            inner = match deadline {
                None => self
                    .not_empty
                    .wait(inner)
                    .map_err(|_| DequeueError::Poisoned)?,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(DequeueError::Timeout);
                    }
                    self.not_empty
                        .wait_timeout(inner, remaining)
                        .map_err(|_| DequeueError::Poisoned)?
                        .0
                },
            };
        }
    }

    fn pop(&self, inner: &mut Inner<T>) -> Option<T> {
        let item = inner.buf.pop_front()?;
        if self.capacity.is_some() {
            self.not_full.notify_one();
        }
        Some(item)
    }

    /// Marks the queue as closed and wakes every blocked caller.
    ///
    /// Closing twice is a no-op. Returns `true` only for the call that
    /// actually closed the queue.
    pub fn close(&self) -> bool {
        // Closing must still release waiters after a panic elsewhere.
        let mut inner = self.lock_snapshot();
        if std::mem::replace(&mut inner.closed, true) {
            return false;
        }
        self.not_empty.notify_all();
        self.not_full.notify_all();
        tracing::debug!("closed queue, remaining={}", inner.buf.len());
        true
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.lock_snapshot().closed
    }

    /// Whether the queue has reached its terminal state.
    ///
    /// This is a snapshot for diagnostics. Consumers should wait in
    /// [`dequeue`](Self::dequeue) for [`DequeueError::ClosedAndEmpty`]
    /// instead of polling this.
    pub fn is_closed_and_empty(&self) -> bool {
        self.state() == QueueState::Done
    }

    pub fn state(&self) -> QueueState {
        self.lock_snapshot().state()
    }

    /// Number of queued items at the time of the call. Advisory only.
    pub fn len(&self) -> usize {
        self.lock_snapshot().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_snapshot().buf.is_empty()
    }
}

impl<T> Default for ConcurrentQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ConcurrentQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock_snapshot();
        f.debug_struct("ConcurrentQueue")
            .field("len", &inner.buf.len())
            .field("closed", &inner.closed)
            .field("capacity", &self.capacity)
            .finish()
    }
}
