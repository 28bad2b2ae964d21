use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll};

use crate::connection::ConnectionId;

/// One readiness multiplexer, watching a single kind of readiness.
///
/// The reactor owns two of them, one for read readiness and one for write
/// readiness, so a socket can sit in both at once. Sockets are registered by
/// raw descriptor because the same socket is registered with two pollers.
///
/// Readiness is edge triggered: callers must consume a read event until the
/// socket would block, and must [`reregister`](Self::reregister) a socket that
/// still has pending output to be told about it again.
#[derive(Debug)]
pub(crate) struct Multiplexer {
    name: &'static str,
    poll: Poll,
    events: Events,
    interest: Interest,
}

impl Multiplexer {
    pub(crate) fn new(name: &'static str, interest: Interest, events_capacity: usize) -> io::Result<Self> {
        Ok(Self { name, poll: Poll::new()?, events: Events::with_capacity(events_capacity), interest })
    }

    pub(crate) fn register(&self, fd: RawFd, id: ConnectionId) -> io::Result<()> {
        self.poll.registry().register(&mut SourceFd(&fd), id.token(), self.interest)
    }

    /// Re-arms an existing registration.
    pub(crate) fn reregister(&self, fd: RawFd, id: ConnectionId) -> io::Result<()> {
        self.poll.registry().reregister(&mut SourceFd(&fd), id.token(), self.interest)
    }

    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        self.poll.registry().deregister(&mut SourceFd(&fd))
    }

    /// Waits up to `timeout` and returns the connections that became ready.
    ///
    /// A zero timeout never blocks. An interrupted wait reports nothing ready.
    pub(crate) fn poll(&mut self, timeout: Duration) -> io::Result<Vec<ConnectionId>> {
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }

        let ready: Vec<ConnectionId> = self.events.iter().map(|event| ConnectionId::from_token(event.token())).collect();
        if !ready.is_empty() {
            tracing::trace!(multiplexer = self.name, ready = ready.len(), "readiness reported");
        }
        Ok(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};
    use std::os::fd::AsRawFd;
    use std::time::Instant;

    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        server.set_nonblocking(true).unwrap();
        (client, server)
    }

    fn poll_until(multiplexer: &mut Multiplexer, id: ConnectionId) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if multiplexer.poll(Duration::from_millis(50)).unwrap().contains(&id) {
                return true;
            }
        }
        false
    }

    #[test]
    fn one_socket_in_both_multiplexers() {
        let (mut client, server) = socket_pair();
        let id = ConnectionId::next();
        let mut reads = Multiplexer::new("read", Interest::READABLE, 16).unwrap();
        let mut writes = Multiplexer::new("write", Interest::WRITABLE, 16).unwrap();

        reads.register(server.as_raw_fd(), id).unwrap();
        writes.register(server.as_raw_fd(), id).unwrap();

        assert!(poll_until(&mut writes, id));
        assert!(reads.poll(Duration::ZERO).unwrap().is_empty());

        client.write_all(b"ping").unwrap();
        assert!(poll_until(&mut reads, id));
    }

    #[test]
    fn reregister_rearms_write_readiness() {
        let (_client, server) = socket_pair();
        let id = ConnectionId::next();
        let mut writes = Multiplexer::new("write", Interest::WRITABLE, 16).unwrap();

        writes.register(server.as_raw_fd(), id).unwrap();
        assert!(poll_until(&mut writes, id));
        assert!(writes.poll(Duration::ZERO).unwrap().is_empty());

        writes.reregister(server.as_raw_fd(), id).unwrap();
        assert!(poll_until(&mut writes, id));
    }

    #[test]
    fn deregistered_socket_is_not_reported() {
        let (mut client, server) = socket_pair();
        let id = ConnectionId::next();
        let mut reads = Multiplexer::new("read", Interest::READABLE, 16).unwrap();

        reads.register(server.as_raw_fd(), id).unwrap();
        reads.deregister(server.as_raw_fd()).unwrap();
        client.write_all(b"ping").unwrap();

        assert!(reads.poll(Duration::from_millis(100)).unwrap().is_empty());
    }
}
