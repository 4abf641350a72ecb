//! One accepted client connection

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use tracing::debug;

use crate::protocol::{encode_result, CommandEnvelope, DecodeError, FrameDecoder, ResultEnvelope};

const READ_CHUNK: usize = 8 * 1024;

/// Per-connection state owned by the listener
///
/// The receive and send buffers belong to this connection only.
#[derive(Debug)]
pub(crate) struct Connection {
    pub(crate) id: u64,
    pub(crate) peer: SocketAddr,
    stream: TcpStream,
    decoder: FrameDecoder,
    outbound: Vec<u8>,
    /// Peer closed its write half; finish pending work, then drop
    eof: bool,
    /// Protocol violation; flush the error reply, then drop
    closing: bool,
    /// Socket failed; drop without further IO
    failed: bool,
}

impl Connection {
    pub(crate) fn new(
        id: u64,
        stream: TcpStream,
        peer: SocketAddr,
        max_frame_bytes: usize,
    ) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            id,
            peer,
            stream,
            decoder: FrameDecoder::new(max_frame_bytes),
            outbound: Vec::new(),
            eof: false,
            closing: false,
            failed: false,
        })
    }

    /// Read whatever is available, up to `budget` bytes
    pub(crate) fn read_available(&mut self, budget: usize) -> usize {
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        while total < budget && !self.eof && !self.failed && !self.closing {
            let want = READ_CHUNK.min(budget - total);
            match self.stream.read(&mut chunk[..want]) {
                Ok(0) => {
                    debug!(conn = self.id, peer = %self.peer, "Peer closed connection");
                    self.eof = true;
                }
                Ok(n) => {
                    self.decoder.push(&chunk[..n]);
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(conn = self.id, peer = %self.peer, error = %e, "Read failed");
                    self.failed = true;
                }
            }
        }
        total
    }

    pub(crate) fn next_command(&mut self) -> Result<Option<CommandEnvelope>, DecodeError> {
        if self.closing || self.failed {
            return Ok(None);
        }
        self.decoder.next_command()
    }

    pub(crate) fn queue(&mut self, result: &ResultEnvelope) {
        self.outbound.extend_from_slice(&encode_result(result));
    }

    /// Stop reading; the connection is dropped after its next flush
    pub(crate) fn close_after_flush(&mut self) {
        self.closing = true;
    }

    /// Write as much queued output as the socket accepts
    pub(crate) fn flush(&mut self) {
        while !self.outbound.is_empty() && !self.failed {
            match self.stream.write(&self.outbound) {
                Ok(0) => self.failed = true,
                Ok(n) => {
                    self.outbound.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(conn = self.id, peer = %self.peer, error = %e, "Write failed");
                    self.failed = true;
                }
            }
        }
    }

    /// Undecoded input or unsent output has reached `limit` bytes
    ///
    /// The listener stops reading from a backlogged connection until the
    /// dispatcher and the peer catch up.
    pub(crate) fn is_backlogged(&self, limit: usize) -> bool {
        self.decoder.buffered() >= limit || self.outbound.len() >= limit
    }

    pub(crate) fn pending_in(&self) -> usize {
        self.decoder.buffered()
    }

    pub(crate) fn pending_out(&self) -> usize {
        self.outbound.len()
    }

    /// No more bytes will arrive
    pub(crate) fn at_eof(&self) -> bool {
        self.eof
    }

    /// Whether the listener should drop this connection now
    pub(crate) fn is_finished(&self) -> bool {
        self.failed || ((self.closing || self.eof) && self.outbound.is_empty())
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
