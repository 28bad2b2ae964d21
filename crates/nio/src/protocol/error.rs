use std::io;
use thiserror::Error;

/// Errors raised while starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind {address} error: {source}")]
    Bind { address: String, source: io::Error },

    #[error("readiness multiplexer error: {source}")]
    Multiplexer { source: io::Error },

    #[error("spawn {name} thread error: {source}")]
    Spawn { name: &'static str, source: io::Error },
}

impl ServerError {
    pub fn bind<A: ToString>(address: A, source: io::Error) -> Self {
        Self::Bind { address: address.to_string(), source }
    }

    pub fn multiplexer(source: io::Error) -> Self {
        Self::Multiplexer { source }
    }

    pub fn spawn(name: &'static str, source: io::Error) -> Self {
        Self::Spawn { name, source }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroCapacity { name: &'static str },

    #[error("staging capacity {staging} is smaller than the buffer initial capacity {buffer}")]
    StagingTooSmall { staging: usize, buffer: usize },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: String },
}

impl ConfigError {
    pub fn zero_capacity(name: &'static str) -> Self {
        Self::ZeroCapacity { name }
    }

    pub fn invalid_address<S: ToString>(str: S) -> Self {
        Self::InvalidAddress { reason: str.to_string() }
    }
}

/// A framing fault: the buffered bytes can never form a valid message.
///
/// Framing faults are connection-fatal, the reactor closes the connection
/// instead of trying to resynchronize on a buffer in an unknown state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("malformed message: {reason}")]
    Malformed { reason: String },
}

impl FrameError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn malformed<S: ToString>(str: S) -> Self {
        Self::Malformed { reason: str.to_string() }
    }
}

/// Backpressure signal of a bounded queue.
///
/// The rejected item is handed back so the caller decides what happens to it.
#[derive(Error, PartialEq, Eq)]
pub enum QueueError<T> {
    #[error("queue is full")]
    Full(T),

    #[error("queue is closed")]
    Closed(T),
}

impl<T> QueueError<T> {
    pub fn is_full(&self) -> bool {
        matches!(self, QueueError::Full(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            QueueError::Full(item) | QueueError::Closed(item) => item,
        }
    }
}

impl<T> std::fmt::Debug for QueueError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Full(_) => f.write_str("Full(..)"),
            QueueError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriterError {
    #[error("outbound writer queue is full, capacity {capacity}")]
    Full { capacity: usize },
}
