//! Per-connection state.
//!
//! - [`Connection`]: binds one non-blocking socket to one receive buffer, one
//!   framer and one outbound writer. It is the unit of isolation, connections
//!   only interact with the rest of the server through the reactor's queues.
//! - [`ConnectionId`]: process-wide unique id, never reused.
//! - [`OutboundWriter`]: drains queued responses onto the socket across as many
//!   partial writes as needed, resuming exactly where the last write stopped.
//! - [`fill_from`]: the read side, moving everything a socket has available
//!   into a receive buffer through a staging buffer.

#[allow(clippy::module_inception, reason = "mirrors the type it defines")]
mod connection;
mod outbound_writer;

pub use connection::{fill_from, Connection, ConnectionId, ReadOutcome};
pub use outbound_writer::OutboundWriter;
