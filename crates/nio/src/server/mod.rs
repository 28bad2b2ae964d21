//! The server runtime.
//!
//! Two threads cooperate:
//!
//! - the acceptor blocks on `accept`, wraps each client in a
//!   [`Connection`](crate::connection::Connection) and publishes it on a bounded
//!   inbound queue
//! - the reactor owns every admitted connection and two readiness multiplexers,
//!   one for read interest and one for write interest, and drives framing,
//!   handling and writing for all of them
//!
//! Only the bounded queues of the [`queue`] module cross thread boundaries.

mod acceptor;
mod multiplexer;
pub mod queue;
mod reactor;
#[allow(clippy::module_inception, reason = "mirrors the type it defines")]
mod server;

pub use server::{Server, ServerHandle};
