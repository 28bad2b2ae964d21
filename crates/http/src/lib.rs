//! HTTP/1.0 on top of micro-nio
//!
//! A small demonstration of the two micro-nio extension points:
//!
//! - [`HttpFramer`] cuts requests out of the byte stream, handling requests split
//!   across reads and several requests arriving in one read
//! - [`demo::demo_handler`] logs each [`HttpRequest`] and answers it with a fixed
//!   page
//!
//! ```no_run
//! use micro_nio::{Server, ServerConfig};
//! use micro_nio_http::demo::demo_handler;
//! use micro_nio_http::HttpFramerFactory;
//!
//! let config = ServerConfig::builder().port(8080).build()?;
//! let handle = Server::new(config, HttpFramerFactory::new(), demo_handler()).start()?;
//! handle.join();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This is not a full HTTP server: chunked transfer coding, keep-alive and TLS
//! are not supported.

pub mod demo;
mod framer;
mod request;

pub use framer::{HttpFramer, HttpFramerFactory, DEFAULT_MAX_HEADER_BYTES};
pub use request::{HttpRequest, RequestLine, RequestLineError};
