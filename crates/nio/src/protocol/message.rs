use bytes::Bytes;

use crate::connection::ConnectionId;

/// A complete outbound message tagged with the connection it belongs to.
///
/// Produced from a handler response by the reactor and consumed by exactly one
/// [`OutboundWriter`](crate::connection::OutboundWriter). The payload is
/// immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    connection_id: ConnectionId,
    payload: Bytes,
}

impl Outbound {
    pub fn new(connection_id: ConnectionId, payload: impl Into<Bytes>) -> Self {
        Self { connection_id, payload: payload.into() }
    }

    #[inline]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_parts(self) -> (ConnectionId, Bytes) {
        (self.connection_id, self.payload)
    }
}
