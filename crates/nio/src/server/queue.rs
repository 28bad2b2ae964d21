//! Bounded hand-off queues between execution contexts.
//!
//! Both the inbound-connection queue (acceptor to reactor) and the outbound
//! message queue (handlers to writers) are bounded. A full queue is never a
//! silent drop: [`QueueSender::offer`] hands the item back inside
//! [`QueueError::Full`], [`QueueSender::put`] blocks until space frees up.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::protocol::QueueError;

/// Creates a queue holding at most `capacity` items.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn bounded<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (QueueSender { inner: sender }, QueueReceiver { inner: receiver })
}

#[derive(Debug)]
pub struct QueueSender<T> {
    inner: mpsc::Sender<T>,
}

impl<T> QueueSender<T> {
    /// Enqueues `item` without blocking.
    ///
    /// # Errors
    ///
    /// - [`QueueError::Full`] when the queue is at capacity
    /// - [`QueueError::Closed`] when the receiving side is gone
    pub fn offer(&self, item: T) -> Result<(), QueueError<T>> {
        self.inner.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => QueueError::Full(item),
            TrySendError::Closed(item) => QueueError::Closed(item),
        })
    }

    /// Enqueues `item`, blocking the calling thread while the queue is full.
    ///
    /// Must not be called from within an async runtime.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] when the receiving side is gone.
    pub fn put(&self, item: T) -> Result<(), QueueError<T>> {
        self.inner.blocking_send(item).map_err(|e| QueueError::Closed(e.0))
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.max_capacity()
    }
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

#[derive(Debug)]
pub struct QueueReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Takes the oldest item without blocking, `None` when the queue is empty
    /// or every sender is gone.
    pub fn poll(&mut self) -> Option<T> {
        match self.inner.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
