use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::framer::{Framer, FramerFactory};
use crate::handler::Handler;
use crate::protocol::ServerError;
use crate::server::acceptor::Acceptor;
use crate::server::queue;
use crate::server::reactor::Reactor;

const ACCEPTOR_THREAD: &str = "micro-nio-acceptor";
const REACTOR_THREAD: &str = "micro-nio-reactor";

/// An embeddable server running one acceptor thread and one reactor thread.
///
/// ```no_run
/// use micro_nio::config::ServerConfig;
/// use micro_nio::handler::make_handler;
/// use micro_nio::Server;
/// # use micro_nio::buffer::ElasticBuffer;
/// # use micro_nio::connection::ConnectionId;
/// # use micro_nio::framer::Framer;
/// # use micro_nio::protocol::FrameError;
/// # struct LineFramer;
/// # impl Framer for LineFramer {
/// #     type Item = String;
/// #     fn decode(&mut self, src: &mut ElasticBuffer) -> Result<Option<String>, FrameError> { Ok(None) }
/// # }
///
/// let config = ServerConfig::builder().port(7000).build()?;
/// let handler = make_handler(|line: String| Some(format!("{line}\n")));
/// let handle = Server::new(config, |_id: ConnectionId| LineFramer, handler).start()?;
/// handle.join();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Server<FF, H> {
    config: ServerConfig,
    framer_factory: FF,
    handler: H,
}

impl<FF, H> Server<FF, H>
where
    FF: FramerFactory + Send + 'static,
    FF::Framer: Send + 'static,
    H: Handler<<FF::Framer as Framer>::Item> + Send + 'static,
    H::Response: Into<Bytes>,
{
    pub fn new(config: ServerConfig, framer_factory: FF, handler: H) -> Self {
        Self { config, framer_factory, handler }
    }

    /// Binds the listener, creates the multiplexers and spawns both threads.
    ///
    /// Returns as soon as the threads are running.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound, a multiplexer cannot be created
    /// or a thread cannot be spawned.
    pub fn start(self) -> Result<ServerHandle, ServerError> {
        let address = self.config.address();
        let listener = TcpListener::bind(address).map_err(|e| ServerError::bind(address, e))?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::bind(address, e))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let (inbound_sender, inbound_receiver) = queue::bounded(self.config.queue_capacity());
        let reactor = Reactor::new(&self.config, self.handler, inbound_receiver, Arc::clone(&shutdown))
            .map_err(ServerError::multiplexer)?;
        let acceptor =
            Acceptor::new(listener, self.framer_factory, inbound_sender, &self.config, Arc::clone(&shutdown));

        let reactor = thread::Builder::new()
            .name(REACTOR_THREAD.into())
            .spawn(move || reactor.run())
            .map_err(|e| ServerError::spawn(REACTOR_THREAD, e))?;

        let acceptor = match thread::Builder::new().name(ACCEPTOR_THREAD.into()).spawn(move || acceptor.run()) {
            Ok(acceptor) => acceptor,
            Err(e) => {
                shutdown.store(true, Ordering::Release);
                if reactor.join().is_err() {
                    error!("reactor thread panicked");
                }
                return Err(ServerError::spawn(ACCEPTOR_THREAD, e));
            }
        };

        info!(address = %local_addr, "server started");
        Ok(ServerHandle { local_addr, shutdown, acceptor, reactor })
    }
}

/// Controls a started [`Server`].
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    acceptor: JoinHandle<()>,
    reactor: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound address, with the actual port when port 0 was configured
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops both threads and waits for them. Live connections are closed.
    pub fn shutdown(self) {
        info!(address = %self.local_addr, "shutting down server");
        self.shutdown.store(true, Ordering::Release);
        wake_acceptor(self.local_addr);
        self.join();
    }

    /// Blocks until both threads have exited.
    pub fn join(self) {
        if self.acceptor.join().is_err() {
            error!("acceptor thread panicked");
        }
        if self.reactor.join().is_err() {
            error!("reactor thread panicked");
        }
    }
}

/// Unblocks a pending `accept` so the acceptor observes the shutdown flag.
fn wake_acceptor(local_addr: SocketAddr) {
    let mut target = local_addr;
    if target.ip().is_unspecified() {
        target.set_ip(match target.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
        });
    }

    if let Err(e) = TcpStream::connect_timeout(&target, Duration::from_secs(1)) {
        error!(cause = %e, address = %target, "failed to wake acceptor");
    }
}
