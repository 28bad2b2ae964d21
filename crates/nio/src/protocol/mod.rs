//! Protocol-neutral message and error types.
//!
//! - [`Outbound`]: a complete response tagged with its owning connection
//! - the error taxonomy of the server:
//!   - [`ServerError`]: failures while starting the server
//!   - [`ConfigError`]: invalid configuration
//!   - [`FrameError`]: framing faults, fatal to the connection
//!   - [`QueueError`]: backpressure from a bounded queue
//!   - [`WriterError`]: an outbound writer that cannot accept more messages

mod message;
pub use message::Outbound;

mod error;
pub use error::ConfigError;
pub use error::FrameError;
pub use error::QueueError;
pub use error::ServerError;
pub use error::WriterError;
