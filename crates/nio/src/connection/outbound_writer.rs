use std::collections::VecDeque;
use std::io::{self, Write};

use bytes::Bytes;
use tracing::trace;

use crate::buffer::StagingBuffer;
use crate::ensure;
use crate::protocol::WriterError;

/// Serializes the responses of one connection onto its socket.
///
/// The writer holds one in-flight message, a bounded FIFO of pending messages
/// and the offset of the first in-flight byte not yet accepted by the socket.
/// `offset` always lies in `[0, in_flight.len()]`; once it reaches the end the
/// writer moves on to the next pending message and resets it to 0.
#[derive(Debug)]
pub struct OutboundWriter {
    in_flight: Option<Bytes>,
    pending: VecDeque<Bytes>,
    offset: usize,
    capacity: usize,
}

impl OutboundWriter {
    /// Creates a writer whose pending queue holds at most `capacity` messages
    pub fn with_capacity(capacity: usize) -> Self {
        Self { in_flight: None, pending: VecDeque::new(), offset: 0, capacity }
    }

    /// Queues `payload` behind the messages already accepted.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Full`] when the pending queue is at capacity.
    pub fn enqueue(&mut self, payload: Bytes) -> Result<(), WriterError> {
        if self.in_flight.is_none() {
            self.in_flight = Some(payload);
            self.offset = 0;
            return Ok(());
        }

        ensure!(self.pending.len() < self.capacity, WriterError::Full { capacity: self.capacity });
        self.pending.push_back(payload);
        Ok(())
    }

    /// Makes write progress on the in-flight message.
    ///
    /// The unwritten remainder of the in-flight message (up to the staging
    /// limit) is staged once and written until the socket stops accepting
    /// bytes. When the message completes the writer advances to the next one,
    /// but never starts writing it in the same call: the next message waits for
    /// the next write-readiness event.
    ///
    /// Returns the number of bytes the socket accepted.
    pub fn drain_once<W: Write>(&mut self, staging: &mut StagingBuffer, socket: &mut W) -> io::Result<usize> {
        let Some(in_flight) = self.in_flight.as_ref() else {
            return Ok(0);
        };

        let total = in_flight.len();
        staging.stage(&in_flight[self.offset..]);

        let (written, result) = write_staged(staging.filled(), socket);
        staging.clear();

        self.offset += written;
        trace!(written, offset = self.offset, total, "drained outbound message");

        if self.offset == total {
            self.in_flight = self.pending.pop_front();
            self.offset = 0;
        }

        result.map(|()| written)
    }

    /// Returns true when there is no in-flight message
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Writes `staged` until it is exhausted, the socket would block or a write
/// returns zero bytes.
fn write_staged<W: Write>(staged: &[u8], socket: &mut W) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < staged.len() {
        match socket.write(&staged[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `per_write` bytes per call and `writes_per_event` calls
    /// per readiness event, then reports would-block.
    struct ThrottledSocket {
        written: Vec<u8>,
        per_write: usize,
        writes_per_event: usize,
        remaining_writes: usize,
    }

    impl ThrottledSocket {
        fn new(per_write: usize, writes_per_event: usize) -> Self {
            Self { written: Vec::new(), per_write, writes_per_event, remaining_writes: writes_per_event }
        }

        fn next_event(&mut self) {
            self.remaining_writes = self.writes_per_event;
        }
    }

    impl Write for ThrottledSocket {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.remaining_writes == 0 {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.remaining_writes -= 1;
            let n = buf.len().min(self.per_write);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenSocket;

    impl Write for BrokenSocket {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn message(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
    }

    #[test]
    fn resumes_partial_writes_without_gaps() {
        let payload = message(100);
        let mut writer = OutboundWriter::with_capacity(4);
        let mut staging = StagingBuffer::new(1024);
        let mut socket = ThrottledSocket::new(7, 2);

        writer.enqueue(payload.clone()).unwrap();

        let mut events = 0;
        while !writer.is_idle() {
            socket.next_event();
            let written = writer.drain_once(&mut staging, &mut socket).unwrap();
            events += 1;

            assert!(staging.is_empty());
            if !writer.is_idle() {
                assert_eq!(writer.offset(), socket.written.len());
                assert_eq!(written, 14);
            }
        }

        assert_eq!(events, 8);
        assert_eq!(socket.written, payload.to_vec());
        assert_eq!(writer.offset(), 0);
    }

    #[test]
    fn writes_one_message_per_drain_in_fifo_order() {
        let mut writer = OutboundWriter::with_capacity(4);
        let mut staging = StagingBuffer::new(1024);
        let mut socket = ThrottledSocket::new(usize::MAX, usize::MAX);

        writer.enqueue(Bytes::from_static(b"first;")).unwrap();
        writer.enqueue(Bytes::from_static(b"second;")).unwrap();
        writer.enqueue(Bytes::from_static(b"third;")).unwrap();

        assert_eq!(writer.drain_once(&mut staging, &mut socket).unwrap(), 6);
        assert_eq!(socket.written, b"first;");
        assert!(!writer.is_idle());

        writer.drain_once(&mut staging, &mut socket).unwrap();
        writer.drain_once(&mut staging, &mut socket).unwrap();

        assert_eq!(socket.written, b"first;second;third;");
        assert!(writer.is_idle());
    }

    #[test]
    fn stages_at_most_the_staging_limit() {
        let payload = message(10);
        let mut writer = OutboundWriter::with_capacity(1);
        let mut staging = StagingBuffer::new(4);
        let mut socket = ThrottledSocket::new(usize::MAX, usize::MAX);

        writer.enqueue(payload.clone()).unwrap();

        assert_eq!(writer.drain_once(&mut staging, &mut socket).unwrap(), 4);
        assert_eq!(writer.drain_once(&mut staging, &mut socket).unwrap(), 4);
        assert_eq!(writer.drain_once(&mut staging, &mut socket).unwrap(), 2);

        assert!(writer.is_idle());
        assert_eq!(socket.written, payload.to_vec());
    }

    #[test]
    fn idle_drain_is_a_no_op() {
        let mut writer = OutboundWriter::with_capacity(1);
        let mut staging = StagingBuffer::new(8);

        assert_eq!(writer.drain_once(&mut staging, &mut BrokenSocket).unwrap(), 0);
        assert!(writer.is_idle());
    }

    #[test]
    fn pending_queue_is_bounded() {
        let mut writer = OutboundWriter::with_capacity(2);

        writer.enqueue(Bytes::from_static(b"in-flight")).unwrap();
        writer.enqueue(Bytes::from_static(b"one")).unwrap();
        writer.enqueue(Bytes::from_static(b"two")).unwrap();

        assert_eq!(writer.enqueue(Bytes::from_static(b"three")), Err(WriterError::Full { capacity: 2 }));
        assert_eq!(writer.pending_len(), 2);
    }

    #[test]
    fn surfaces_transport_errors() {
        let mut writer = OutboundWriter::with_capacity(1);
        let mut staging = StagingBuffer::new(8);
        writer.enqueue(Bytes::from_static(b"lost")).unwrap();

        let error = writer.drain_once(&mut staging, &mut BrokenSocket).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
        assert!(!writer.is_idle());
        assert!(staging.is_empty());
    }
}
