use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use mio::Interest;
use tracing::{debug, error, info, trace, warn};

use crate::buffer::StagingBuffer;
use crate::config::ServerConfig;
use crate::connection::{Connection, ConnectionId};
use crate::framer::Framer;
use crate::handler::Handler;
use crate::protocol::{Outbound, QueueError};
use crate::server::multiplexer::Multiplexer;
use crate::server::queue::{self, QueueReceiver, QueueSender};

/// The single-threaded event loop.
///
/// Every connection is owned by `connected`; the three bookkeeping sets only
/// hold ids. `active_writers` and `inactive_writers` batch write-interest
/// changes so they are applied once per iteration, `closing` holds connections
/// that no longer read and are closed once their writer is idle.
pub(crate) struct Reactor<F, H> {
    handler: H,
    inbound: QueueReceiver<Connection<F>>,
    outbound_sender: QueueSender<Outbound>,
    outbound_receiver: QueueReceiver<Outbound>,
    connected: HashMap<ConnectionId, Connection<F>>,
    active_writers: HashSet<ConnectionId>,
    inactive_writers: HashSet<ConnectionId>,
    closing: HashSet<ConnectionId>,
    read_mux: Multiplexer,
    write_mux: Multiplexer,
    read_staging: StagingBuffer,
    write_staging: StagingBuffer,
    poll_timeout: Duration,
    shutdown: Arc<AtomicBool>,
}

impl<F, H> Reactor<F, H>
where
    F: Framer,
    H: Handler<F::Item>,
    H::Response: Into<Bytes>,
{
    pub(crate) fn new(
        config: &ServerConfig,
        handler: H,
        inbound: QueueReceiver<Connection<F>>,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let (outbound_sender, outbound_receiver) = queue::bounded(config.queue_capacity());
        Ok(Self {
            handler,
            inbound,
            outbound_sender,
            outbound_receiver,
            connected: HashMap::new(),
            active_writers: HashSet::new(),
            inactive_writers: HashSet::new(),
            closing: HashSet::new(),
            read_mux: Multiplexer::new("read", Interest::READABLE, config.events_capacity())?,
            write_mux: Multiplexer::new("write", Interest::WRITABLE, config.events_capacity())?,
            read_staging: StagingBuffer::new(config.staging_capacity()),
            write_staging: StagingBuffer::new(config.staging_capacity()),
            poll_timeout: config.poll_timeout(),
            shutdown,
        })
    }

    pub(crate) fn run(mut self) {
        info!(poll_timeout = ?self.poll_timeout, "reactor started");
        while !self.shutdown.load(Ordering::Acquire) {
            self.turn();
        }

        let live: Vec<ConnectionId> = self.connected.keys().copied().collect();
        for id in live {
            self.close(id);
        }
        info!("reactor stopped");
    }

    /// One loop iteration.
    pub(crate) fn turn(&mut self) {
        self.admit();
        self.read_ready();
        self.promote_writers();
        self.sync_write_registration();
        self.write_ready();
        self.close_drained();
    }

    fn admit(&mut self) {
        while let Some(mut connection) = self.inbound.poll() {
            let id = connection.id();
            if let Err(e) = self.read_mux.register(connection.raw_fd(), id) {
                warn!(connection = %id, cause = %e, "failed to register read interest, dropping connection");
                continue;
            }
            connection.set_read_registered(true);

            info!(connection = %id, peer = %connection.peer_addr(), "connection admitted");
            self.connected.insert(id, connection);
        }
    }

    fn read_ready(&mut self) {
        let ready = match self.read_mux.poll(self.poll_timeout) {
            Ok(ready) => ready,
            Err(e) => {
                warn!(cause = %e, "read poll failed");
                return;
            }
        };

        for id in ready {
            self.process_readable(id);
        }
    }

    /// Reads everything available, frames it and hands each message to the
    /// handler.
    fn process_readable(&mut self, id: ConnectionId) {
        let Some(connection) = self.connected.get_mut(&id) else {
            return;
        };

        let outcome = match connection.read(&mut self.read_staging) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(connection = %id, cause = %e, "read failed, closing connection");
                self.close(id);
                return;
            }
        };
        if outcome.end_of_stream {
            connection.mark_end_of_stream();
        }

        let mut responses: Vec<Bytes> = Vec::new();
        let framed = loop {
            match connection.decode() {
                Ok(Some(message)) => {
                    if let Some(response) = self.handler.handle(message) {
                        responses.push(response.into());
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        trace!(connection = %id, responses = responses.len(), retained = connection.receive_buffer().len(), "framed messages");

        for payload in responses {
            self.offer(Outbound::new(id, payload));
        }

        match framed {
            Err(e) => {
                warn!(connection = %id, cause = %e, "framing fault, closing connection");
                self.stop_reading(id);
            }
            Ok(()) if outcome.end_of_stream => {
                debug!(connection = %id, "end of stream");
                self.stop_reading(id);
            }
            Ok(()) => {}
        }
    }

    /// Puts a response on the outbound queue.
    ///
    /// When the queue is full every queued response is promoted to its writer
    /// right away and the offer is retried once. If that fails too the owning
    /// connection is closed.
    fn offer(&mut self, outbound: Outbound) {
        let outbound = match self.outbound_sender.offer(outbound) {
            Ok(()) => return,
            Err(QueueError::Full(outbound)) => outbound,
            Err(QueueError::Closed(outbound)) => {
                error!(connection = %outbound.connection_id(), "outbound queue closed, closing connection");
                self.close(outbound.connection_id());
                return;
            }
        };

        warn!(
            connection = %outbound.connection_id(),
            capacity = self.outbound_sender.capacity(),
            "outbound queue full, promoting queued responses early"
        );
        self.promote_writers();

        if let Err(e) = self.outbound_sender.offer(outbound) {
            let id = e.into_inner().connection_id();
            error!(connection = %id, "outbound queue still full, closing connection");
            self.close(id);
        }
    }

    fn promote_writers(&mut self) {
        while let Some(outbound) = self.outbound_receiver.poll() {
            let (id, payload) = outbound.into_parts();
            let Some(connection) = self.connected.get_mut(&id) else {
                debug!(connection = %id, "discard response of closed connection");
                continue;
            };

            if let Err(e) = connection.enqueue(payload) {
                warn!(connection = %id, cause = %e, "closing connection");
                self.close(id);
                continue;
            }

            self.inactive_writers.remove(&id);
            self.active_writers.insert(id);
        }
    }

    /// Arms write interest for active writers and cancels it for inactive ones.
    ///
    /// Registered connections are re-registered: readiness is edge triggered,
    /// re-arming makes the multiplexer report a still writable socket again.
    fn sync_write_registration(&mut self) {
        let mut failed = Vec::new();

        for id in self.active_writers.drain() {
            let Some(connection) = self.connected.get_mut(&id) else {
                continue;
            };

            let result = if connection.is_write_registered() {
                self.write_mux.reregister(connection.raw_fd(), id)
            } else {
                self.write_mux.register(connection.raw_fd(), id)
            };
            match result {
                Ok(()) => connection.set_write_registered(true),
                Err(e) => {
                    warn!(connection = %id, cause = %e, "failed to register write interest");
                    failed.push(id);
                }
            }
        }

        for id in self.inactive_writers.drain() {
            let Some(connection) = self.connected.get_mut(&id) else {
                continue;
            };
            if !connection.is_write_registered() {
                continue;
            }

            if let Err(e) = self.write_mux.deregister(connection.raw_fd()) {
                debug!(connection = %id, cause = %e, "failed to cancel write interest");
            }
            connection.set_write_registered(false);
            trace!(connection = %id, "write interest cancelled");
        }

        for id in failed {
            self.close(id);
        }
    }

    fn write_ready(&mut self) {
        let ready = match self.write_mux.poll(Duration::ZERO) {
            Ok(ready) => ready,
            Err(e) => {
                warn!(cause = %e, "write poll failed");
                return;
            }
        };

        let mut failed = Vec::new();
        for id in ready {
            let Some(connection) = self.connected.get_mut(&id) else {
                continue;
            };

            if let Err(e) = connection.write(&mut self.write_staging) {
                warn!(connection = %id, cause = %e, "write failed, closing connection");
                failed.push(id);
                continue;
            }

            if connection.writer().is_idle() {
                self.inactive_writers.insert(id);
            } else {
                self.active_writers.insert(id);
            }
        }

        for id in failed {
            self.close(id);
        }
    }

    fn close_drained(&mut self) {
        let drained: Vec<ConnectionId> = self
            .closing
            .iter()
            .copied()
            .filter(|id| self.connected.get(id).is_none_or(|connection| connection.writer().is_idle()))
            .collect();

        for id in drained {
            self.close(id);
        }
    }

    /// Stops reading from `id`; it is closed once its writer is idle.
    fn stop_reading(&mut self, id: ConnectionId) {
        let Some(connection) = self.connected.get_mut(&id) else {
            return;
        };

        if connection.is_read_registered() {
            if let Err(e) = self.read_mux.deregister(connection.raw_fd()) {
                debug!(connection = %id, cause = %e, "failed to cancel read interest");
            }
            connection.set_read_registered(false);
        }
        self.closing.insert(id);
    }

    /// Deregisters `id` from both multiplexers, forgets it and drops its socket.
    fn close(&mut self, id: ConnectionId) {
        self.active_writers.remove(&id);
        self.inactive_writers.remove(&id);
        self.closing.remove(&id);

        let Some(connection) = self.connected.remove(&id) else {
            return;
        };

        if connection.is_read_registered() {
            if let Err(e) = self.read_mux.deregister(connection.raw_fd()) {
                debug!(connection = %id, cause = %e, "failed to cancel read interest");
            }
        }
        if connection.is_write_registered() {
            if let Err(e) = self.write_mux.deregister(connection.raw_fd()) {
                debug!(connection = %id, cause = %e, "failed to cancel write interest");
            }
        }

        info!(connection = %id, peer = %connection.peer_addr(), end_of_stream = connection.is_end_of_stream(), "connection closed");
    }
}
