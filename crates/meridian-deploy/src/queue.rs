//! Bounded multi-consumer work queue with a single close operation.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::Mutex;

use tokio::sync::Notify;

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A blocking FIFO shared between one producer and many consumers.
///
/// Pushes wait while the queue is full; consumers wait while it is empty.
/// After [`WorkQueue::close`], consumers drain the remaining items and then
/// observe `None`, which is their signal to terminate gracefully.
pub(crate) struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
    readable: Notify,
    writable: Notify,
}

impl<T> WorkQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity: capacity.max(1),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Appends an item, waiting for space if the queue is full. Pushing to a
    /// closed queue drops the item.
    pub async fn push(&self, item: T) {
        let mut item = Some(item);
        loop {
            // Register for a wakeup before inspecting state, so a close or
            // pop between the check and the await cannot be missed.
            let mut writable = pin!(self.writable.notified());
            writable.as_mut().enable();
            {
                let mut inner = self.inner.lock().expect("work queue lock poisoned");
                if inner.closed {
                    return;
                }
                if inner.items.len() < self.capacity {
                    if let Some(item) = item.take() {
                        inner.items.push_back(item);
                    }
                    self.readable.notify_one();
                    return;
                }
            }
            writable.await;
        }
    }

    /// Closes the queue. Idempotent; wakes every waiting producer and
    /// consumer.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock().expect("work queue lock poisoned");
            inner.closed = true;
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Removes the next item, waiting for one if the queue is empty.
    /// Returns `None` once the queue is closed and drained.
    pub async fn next(&self) -> Option<T> {
        loop {
            let mut readable = pin!(self.readable.notified());
            readable.as_mut().enable();
            {
                let mut inner = self.inner.lock().expect("work queue lock poisoned");
                if let Some(item) = inner.items.pop_front() {
                    self.writable.notify_one();
                    return Some(item);
                }
                if inner.closed {
                    return None;
                }
            }
            readable.await;
        }
    }
}
