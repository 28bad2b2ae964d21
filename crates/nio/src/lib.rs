//! An embeddable readiness-based micro server
//!
//! This crate multiplexes many client connections on two threads using
//! non-blocking sockets and readiness notification. It does not know any wire
//! protocol: the embedding application plugs one in through two extension
//! points.
//!
//! - a [`framer::Framer`] turns the raw, arbitrarily fragmented or coalesced
//!   byte stream of one connection into complete messages
//! - a [`handler::Handler`] turns one complete message into an optional response
//!
//! # Example
//!
//! ```no_run
//! use micro_nio::buffer::ElasticBuffer;
//! use micro_nio::config::ServerConfig;
//! use micro_nio::connection::ConnectionId;
//! use micro_nio::framer::Framer;
//! use micro_nio::handler::make_handler;
//! use micro_nio::protocol::FrameError;
//! use micro_nio::Server;
//!
//! /// Newline delimited messages
//! struct LineFramer;
//!
//! impl Framer for LineFramer {
//!     type Item = String;
//!
//!     fn decode(&mut self, src: &mut ElasticBuffer) -> Result<Option<String>, FrameError> {
//!         let Some(end) = src.iter().position(|b| *b == b'\n') else {
//!             return Ok(None);
//!         };
//!         let line = src.take_message(end + 1);
//!         Ok(Some(String::from_utf8_lossy(&line[..end]).into_owned()))
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().port(7000).build()?;
//!     let echo = make_handler(|line: String| Some(format!("{line}\n")));
//!
//!     let handle = Server::new(config, |_id: ConnectionId| LineFramer, echo).start()?;
//!     handle.join();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`buffer`]: the elastic receive buffer and the reactor's staging buffers
//! - [`framer`]: the framing contract and per-connection framer factories
//! - [`handler`]: handler trait, closure adapter and chain composition
//! - [`connection`]: per-connection state, ids and the outbound writer
//! - [`server`]: bounded queues, the acceptor and reactor threads, lifecycle
//! - [`config`]: server configuration
//! - [`protocol`]: outbound messages and the error types
//!
//! # Threads
//!
//! The acceptor thread blocks on `accept` and hands new connections to the
//! reactor through a bounded queue. The reactor thread owns every admitted
//! connection. Framers and handlers run on the reactor thread and need no
//! synchronization, but a slow handler stalls every connection.
//!
//! # Failure handling
//!
//! - transport faults and framing faults close the affected connection
//! - end-of-stream stops reading, the connection is closed once its pending
//!   responses are written
//! - a full outbound queue is never a silent drop, see [`server::queue`]
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.

pub mod buffer;
pub mod config;
pub mod connection;
pub mod framer;
pub mod handler;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;

pub use config::ServerConfig;
pub use server::{Server, ServerHandle};
