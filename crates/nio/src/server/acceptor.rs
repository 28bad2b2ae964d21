use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionId};
use crate::framer::FramerFactory;
use crate::server::queue::QueueSender;

/// Accepts clients on a blocking listener and hands them to the reactor.
pub(crate) struct Acceptor<FF: FramerFactory> {
    listener: TcpListener,
    framer_factory: FF,
    inbound: QueueSender<Connection<FF::Framer>>,
    buffer_initial_capacity: usize,
    queue_capacity: usize,
    shutdown: Arc<AtomicBool>,
}

impl<FF: FramerFactory> Acceptor<FF> {
    pub(crate) fn new(
        listener: TcpListener,
        framer_factory: FF,
        inbound: QueueSender<Connection<FF::Framer>>,
        config: &ServerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            listener,
            framer_factory,
            inbound,
            buffer_initial_capacity: config.buffer_initial_capacity(),
            queue_capacity: config.queue_capacity(),
            shutdown,
        }
    }

    /// Runs until shutdown is requested or the reactor is gone.
    ///
    /// A full inbound queue blocks this thread, so new clients wait in the
    /// listen backlog until the reactor catches up.
    pub(crate) fn run(self) {
        info!("acceptor started");
        loop {
            let accepted = self.listener.accept();
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let (stream, peer_addr) = match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let connection = match self.admit(stream, peer_addr) {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(cause = %e, peer = %peer_addr, "failed to prepare accepted socket");
                    continue;
                }
            };

            debug!(connection = %connection.id(), peer = %peer_addr, "accepted connection");
            if self.inbound.put(connection).is_err() {
                warn!("reactor is gone, stop accepting");
                break;
            }
        }
        info!("acceptor stopped");
    }

    fn admit(&self, stream: TcpStream, peer_addr: SocketAddr) -> io::Result<Connection<FF::Framer>> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;

        let id = ConnectionId::next();
        let framer = self.framer_factory.create(id);
        Ok(Connection::new(id, stream, peer_addr, framer, self.buffer_initial_capacity, self.queue_capacity))
    }
}
