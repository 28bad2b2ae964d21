//! Stream framing contract.
//!
//! A [`Framer`] turns the bytes accumulated in a connection's
//! [`ElasticBuffer`] into complete application messages. Reads may stop at any
//! byte, so one read event can deliver less than a message, exactly one or
//! more messages, or whole messages followed by the start of the next one.
//! Implementations must uphold the following:
//!
//! 1. When the buffer does not hold a complete message, `decode` returns
//!    `Ok(None)` and leaves the buffer untouched. The next read appends to the
//!    same bytes and the framer re-examines them.
//! 2. When a message is produced, exactly the bytes it consumed are removed
//!    from the buffer, the following bytes stay at index 0.
//! 3. A framer instance serves one connection and keeps no state about others.
//!
//! Framers are created per connection by a [`FramerFactory`].

use crate::buffer::ElasticBuffer;
use crate::connection::ConnectionId;
use crate::protocol::FrameError;

pub trait Framer {
    /// The complete message produced by this framer
    type Item;

    /// Attempts to extract one complete message from the front of `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(item))`: a message was extracted and its bytes removed from `src`
    /// - `Ok(None)`: more data is needed, `src` is unchanged
    /// - `Err(_)`: the buffered bytes can never form a message
    fn decode(&mut self, src: &mut ElasticBuffer) -> Result<Option<Self::Item>, FrameError>;

    /// Extracts every complete message currently in `src`, in order, leaving a
    /// trailing partial message (if any) in place.
    fn parse(&mut self, src: &mut ElasticBuffer) -> Result<Vec<Self::Item>, FrameError> {
        let mut items = Vec::new();
        while let Some(item) = self.decode(src)? {
            items.push(item);
        }
        Ok(items)
    }
}

/// Creates a fresh [`Framer`] for every accepted connection.
pub trait FramerFactory {
    type Framer: Framer;

    fn create(&self, connection_id: ConnectionId) -> Self::Framer;
}

impl<F, T> FramerFactory for F
where
    F: Fn(ConnectionId) -> T,
    T: Framer,
{
    type Framer = T;

    fn create(&self, connection_id: ConnectionId) -> Self::Framer {
        (self)(connection_id)
    }
}
