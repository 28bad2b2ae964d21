//! Server configuration.
//!
//! ```
//! use micro_nio::config::ServerConfig;
//!
//! let config = ServerConfig::builder().port(0).queue_capacity(64).build().unwrap();
//! assert_eq!(config.staging_capacity(), config.buffer_initial_capacity() * 100);
//! ```

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::ensure;
use crate::protocol::ConfigError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BUFFER_INITIAL_CAPACITY: usize = 4 * 1024;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// Staging buffers default to this many receive buffers
const STAGING_MULTIPLIER: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    address: SocketAddr,
    buffer_initial_capacity: usize,
    queue_capacity: usize,
    staging_capacity: usize,
    poll_timeout: Duration,
    events_capacity: usize,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    #[inline]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Initial capacity of every connection's receive buffer
    #[inline]
    pub fn buffer_initial_capacity(&self) -> usize {
        self.buffer_initial_capacity
    }

    /// Capacity shared by the inbound-connection queue, the outbound-message
    /// queue and each connection's pending-response queue
    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    #[inline]
    pub fn staging_capacity(&self) -> usize {
        self.staging_capacity
    }

    /// How long the reactor waits for read readiness per iteration. Zero makes
    /// the reactor busy-loop.
    #[inline]
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    #[inline]
    pub fn events_capacity(&self) -> usize {
        self.events_capacity
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            buffer_initial_capacity: DEFAULT_BUFFER_INITIAL_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            staging_capacity: DEFAULT_BUFFER_INITIAL_CAPACITY * STAGING_MULTIPLIER,
            poll_timeout: Duration::ZERO,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub struct ServerConfigBuilder {
    address: Option<Result<SocketAddr, ConfigError>>,
    port: Option<u16>,
    buffer_initial_capacity: usize,
    queue_capacity: usize,
    staging_capacity: Option<usize>,
    poll_timeout: Duration,
    events_capacity: usize,
}

impl ServerConfigBuilder {
    fn new() -> Self {
        Self {
            address: None,
            port: None,
            buffer_initial_capacity: DEFAULT_BUFFER_INITIAL_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            staging_capacity: None,
            poll_timeout: Duration::ZERO,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
        }
    }

    /// Sets the bind address, the first resolved address is used.
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        let resolved = address
            .to_socket_addrs()
            .map_err(ConfigError::invalid_address)
            .and_then(|mut addrs| addrs.next().ok_or_else(|| ConfigError::invalid_address("no address resolved")));
        self.address = Some(resolved);
        self
    }

    /// Overrides the port of the bind address.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn buffer_initial_capacity(mut self, capacity: usize) -> Self {
        self.buffer_initial_capacity = capacity;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn staging_capacity(mut self, capacity: usize) -> Self {
        self.staging_capacity = Some(capacity);
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let mut address = match self.address {
            Some(resolved) => resolved?,
            None => SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
        };
        if let Some(port) = self.port {
            address.set_port(port);
        }

        ensure!(self.buffer_initial_capacity > 0, ConfigError::zero_capacity("buffer_initial_capacity"));
        ensure!(self.queue_capacity > 0, ConfigError::zero_capacity("queue_capacity"));
        ensure!(self.events_capacity > 0, ConfigError::zero_capacity("events_capacity"));

        let staging_capacity =
            self.staging_capacity.unwrap_or_else(|| self.buffer_initial_capacity.saturating_mul(STAGING_MULTIPLIER));
        ensure!(
            staging_capacity >= self.buffer_initial_capacity,
            ConfigError::StagingTooSmall { staging: staging_capacity, buffer: self.buffer_initial_capacity }
        );

        Ok(ServerConfig {
            address,
            buffer_initial_capacity: self.buffer_initial_capacity,
            queue_capacity: self.queue_capacity,
            staging_capacity,
            poll_timeout: self.poll_timeout,
            events_capacity: self.events_capacity,
        })
    }
}
