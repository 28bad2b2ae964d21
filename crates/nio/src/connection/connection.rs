use std::fmt;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use mio::Token;
use tracing::trace;

use crate::buffer::{ElasticBuffer, StagingBuffer};
use crate::connection::OutboundWriter;
use crate::framer::Framer;
use crate::protocol::{FrameError, WriterError};

/// Process-wide id source. Starts at 0 when the process starts and is never
/// reset, so ids are not reused.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of a connection, also used as its readiness token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next id of this process
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) fn token(self) -> Token {
        Token(self.0 as usize)
    }

    #[inline]
    pub(crate) fn from_token(token: Token) -> Self {
        Self(token.0 as u64)
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection#{}", self.0)
    }
}

/// What one read event delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOutcome {
    pub bytes_read: usize,
    pub end_of_stream: bool,
}

/// Reads everything `reader` has available right now into `dst`.
///
/// Reading stops when the reader would block or reports end-of-stream. Bytes
/// travel through `staging`, which is flushed into `dst` whenever it fills up
/// and is left empty on return, including on error.
pub fn fill_from<R: Read>(reader: &mut R, staging: &mut StagingBuffer, dst: &mut ElasticBuffer) -> io::Result<ReadOutcome> {
    let mut outcome = ReadOutcome::default();

    let result = loop {
        if staging.is_full() {
            dst.append(staging.filled());
            staging.clear();
        }

        match reader.read(staging.spare_mut()) {
            Ok(0) => {
                outcome.end_of_stream = true;
                break Ok(());
            }
            Ok(n) => {
                staging.advance(n);
                outcome.bytes_read += n;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => break Err(e),
        }
    };

    dst.append(staging.filled());
    staging.clear();

    result.map(|()| outcome)
}

/// One accepted client.
///
/// A connection exclusively owns its socket, receive buffer, framer and
/// outbound writer. Nothing is shared with other connections.
pub struct Connection<F> {
    id: ConnectionId,
    stream: TcpStream,
    peer_addr: SocketAddr,
    receive_buffer: ElasticBuffer,
    framer: F,
    writer: OutboundWriter,
    end_of_stream: bool,
    read_registered: bool,
    write_registered: bool,
}

impl<F> Connection<F> {
    /// Wraps an accepted, already non-blocking `stream`.
    pub fn new(id: ConnectionId, stream: TcpStream, peer_addr: SocketAddr, framer: F, buffer_initial_capacity: usize, queue_capacity: usize) -> Self {
        Self {
            id,
            stream,
            peer_addr,
            receive_buffer: ElasticBuffer::new(buffer_initial_capacity),
            framer,
            writer: OutboundWriter::with_capacity(queue_capacity),
            end_of_stream: false,
            read_registered: false,
            write_registered: false,
        }
    }

    #[inline]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    #[inline]
    pub fn receive_buffer(&self) -> &ElasticBuffer {
        &self.receive_buffer
    }

    #[inline]
    pub fn writer(&self) -> &OutboundWriter {
        &self.writer
    }

    #[inline]
    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    pub(crate) fn mark_end_of_stream(&mut self) {
        self.end_of_stream = true;
    }

    /// Reads all currently available bytes into the receive buffer.
    pub fn read(&mut self, staging: &mut StagingBuffer) -> io::Result<ReadOutcome> {
        let outcome = fill_from(&mut &self.stream, staging, &mut self.receive_buffer)?;
        trace!(connection = %self.id, bytes_read = outcome.bytes_read, end_of_stream = outcome.end_of_stream, "read socket");
        Ok(outcome)
    }

    /// Hands `payload` to the outbound writer.
    pub fn enqueue(&mut self, payload: Bytes) -> Result<(), WriterError> {
        self.writer.enqueue(payload)
    }

    /// Makes write progress, see [`OutboundWriter::drain_once`].
    pub fn write(&mut self, staging: &mut StagingBuffer) -> io::Result<usize> {
        self.writer.drain_once(staging, &mut &self.stream)
    }

    #[inline]
    pub(crate) fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    #[inline]
    pub(crate) fn is_read_registered(&self) -> bool {
        self.read_registered
    }

    #[inline]
    pub(crate) fn set_read_registered(&mut self, registered: bool) {
        self.read_registered = registered;
    }

    #[inline]
    pub(crate) fn is_write_registered(&self) -> bool {
        self.write_registered
    }

    #[inline]
    pub(crate) fn set_write_registered(&mut self, registered: bool) {
        self.write_registered = registered;
    }
}

impl<F: Framer> Connection<F> {
    /// Extracts the next complete message from the receive buffer, if any.
    pub fn decode(&mut self) -> Result<Option<F::Item>, FrameError> {
        self.framer.decode(&mut self.receive_buffer)
    }
}

impl<F> fmt::Debug for Connection<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("buffered", &self.receive_buffer.len())
            .field("writer", &self.writer)
            .field("end_of_stream", &self.end_of_stream)
            .field("read_registered", &self.read_registered)
            .field("write_registered", &self.write_registered)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a script of read results, one per call.
    struct ScriptedReader {
        script: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(script: Vec<io::Result<Vec<u8>>>) -> Self {
            Self { script: script.into() }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.script.pop_front() {
                None => Err(io::ErrorKind::WouldBlock.into()),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.script.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
            }
        }
    }

    #[test]
    fn reads_until_would_block() {
        let mut reader = ScriptedReader::new(vec![Ok(b"GET / ".to_vec()), Ok(b"HTTP/1.0\r\n".to_vec())]);
        let mut staging = StagingBuffer::new(64);
        let mut dst = ElasticBuffer::new(8);

        let outcome = fill_from(&mut reader, &mut staging, &mut dst).unwrap();

        assert_eq!(outcome, ReadOutcome { bytes_read: 16, end_of_stream: false });
        assert_eq!(&dst[..], b"GET / HTTP/1.0\r\n");
        assert!(staging.is_empty());
    }

    #[test]
    fn flushes_staging_when_full() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut reader = ScriptedReader::new(vec![Ok(payload.clone())]);
        let mut staging = StagingBuffer::new(7);
        let mut dst = ElasticBuffer::new(4);

        let outcome = fill_from(&mut reader, &mut staging, &mut dst).unwrap();

        assert_eq!(outcome.bytes_read, 1000);
        assert_eq!(&dst[..], &payload[..]);
    }

    #[test]
    fn keeps_bytes_read_before_end_of_stream() {
        let mut reader = ScriptedReader::new(vec![Ok(b"tail".to_vec()), Ok(Vec::new())]);
        let mut staging = StagingBuffer::new(64);
        let mut dst = ElasticBuffer::new(8);

        let outcome = fill_from(&mut reader, &mut staging, &mut dst).unwrap();

        assert_eq!(outcome, ReadOutcome { bytes_read: 4, end_of_stream: true });
        assert_eq!(&dst[..], b"tail");
    }

    #[test]
    fn retries_interrupted_reads() {
        let mut reader = ScriptedReader::new(vec![Err(io::ErrorKind::Interrupted.into()), Ok(b"ok".to_vec())]);
        let mut staging = StagingBuffer::new(64);
        let mut dst = ElasticBuffer::new(8);

        let outcome = fill_from(&mut reader, &mut staging, &mut dst).unwrap();

        assert_eq!(outcome.bytes_read, 2);
        assert_eq!(&dst[..], b"ok");
    }

    #[test]
    fn surfaces_transport_errors_and_keeps_read_bytes() {
        let mut reader = ScriptedReader::new(vec![Ok(b"part".to_vec()), Err(io::ErrorKind::ConnectionReset.into())]);
        let mut staging = StagingBuffer::new(64);
        let mut dst = ElasticBuffer::new(8);

        let error = fill_from(&mut reader, &mut staging, &mut dst).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(&dst[..], b"part");
        assert!(staging.is_empty());
    }

    #[test]
    fn reused_staging_delivers_exact_bytes() {
        let mut staging = StagingBuffer::new(16);

        let mut first = ScriptedReader::new(vec![Ok(b"0123456789abcdefXYZ".to_vec())]);
        let mut first_dst = ElasticBuffer::new(8);
        fill_from(&mut first, &mut staging, &mut first_dst).unwrap();

        let mut second = ScriptedReader::new(vec![Ok(b"hi".to_vec())]);
        let mut second_dst = ElasticBuffer::new(8);
        let outcome = fill_from(&mut second, &mut staging, &mut second_dst).unwrap();

        assert_eq!(&first_dst[..], b"0123456789abcdefXYZ");
        assert_eq!(outcome.bytes_read, 2);
        assert_eq!(&second_dst[..], b"hi");
        assert!(staging.is_empty());
    }

    #[test]
    fn connection_ids_are_unique_and_increasing() {
        let first = ConnectionId::next();
        let second = ConnectionId::next();

        assert!(second > first);
        assert_eq!(ConnectionId::from_token(second.token()), second);
        assert_eq!(ConnectionId::from(3).to_string(), "connection#3");
    }
}
