//! Byte sources the synchronizer reads from
//!
//! Two framings are supported:
//!
//! - **Stream** (TCP, capture files, in-memory buffers): ordered bytes with
//!   arbitrary read boundaries; a read of zero bytes means the peer closed.
//! - **Datagram** (UDP): every read yields exactly one datagram; boundaries
//!   are meaningful and bytes never span two reads.
//!
//! Connection setup is the caller's job. Transports are built from already
//! opened handles.

use bytes::BytesMut;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

/// How a transport delimits the bytes it delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Ordered byte stream, partial reads possible
    Stream,
    /// One record-bearing datagram per read
    Datagram,
}

/// A source of record bytes
pub trait Transport {
    /// Framing of the bytes returned by [`Transport::read_into`]
    fn framing(&self) -> Framing;

    /// Perform one blocking read and append what arrived to `buf`.
    ///
    /// Stream transports append at most `max` bytes and return `Ok(0)` once
    /// the peer has closed. Datagram transports append one whole datagram
    /// (truncated to `max`). Timeouts surface as `WouldBlock`/`TimedOut`.
    fn read_into(&mut self, buf: &mut BytesMut, max: usize) -> io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn framing(&self) -> Framing {
        (**self).framing()
    }

    fn read_into(&mut self, buf: &mut BytesMut, max: usize) -> io::Result<usize> {
        (**self).read_into(buf, max)
    }
}

/// Append up to `max` bytes produced by `read` to `buf`
fn append_with<F>(buf: &mut BytesMut, max: usize, read: F) -> io::Result<usize>
where
    F: FnOnce(&mut [u8]) -> io::Result<usize>,
{
    let start = buf.len();
    buf.resize(start + max, 0);
    match read(&mut buf[start..]) {
        Ok(n) => {
            buf.truncate(start + n);
            Ok(n)
        }
        Err(err) => {
            buf.truncate(start);
            Err(err)
        }
    }
}

/// Stream framing over any reader
#[derive(Debug)]
pub struct StreamTransport<R> {
    inner: R,
}

impl<R: Read> StreamTransport<R> {
    /// Wrap a reader
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrow the underlying reader
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the transport and return the reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl StreamTransport<TcpStream> {
    /// Wrap a connected TCP stream and apply the read deadline
    pub fn tcp(stream: TcpStream, read_timeout: Option<Duration>) -> io::Result<Self> {
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    /// Address of the instrument
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }
}

impl<R: Read> Transport for StreamTransport<R> {
    fn framing(&self) -> Framing {
        Framing::Stream
    }

    fn read_into(&mut self, buf: &mut BytesMut, max: usize) -> io::Result<usize> {
        let inner = &mut self.inner;
        append_with(buf, max, |dst| inner.read(dst))
    }
}

/// Datagram framing over a bound UDP socket
#[derive(Debug)]
pub struct DatagramTransport {
    socket: UdpSocket,
}

impl DatagramTransport {
    /// Wrap a bound socket and apply the read deadline
    pub fn new(socket: UdpSocket, read_timeout: Option<Duration>) -> io::Result<Self> {
        socket.set_read_timeout(read_timeout)?;
        Ok(Self { socket })
    }

    /// Local address the socket listens on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for DatagramTransport {
    fn framing(&self) -> Framing {
        Framing::Datagram
    }

    fn read_into(&mut self, buf: &mut BytesMut, max: usize) -> io::Result<usize> {
        let socket = &self.socket;
        append_with(buf, max, |dst| socket.recv(dst))
    }
}

/// Datagram framing over a scripted list of datagrams.
///
/// Replays captured UDP traffic; reports `UnexpectedEof` once drained.
#[derive(Debug, Default)]
pub struct DatagramQueue {
    datagrams: VecDeque<Vec<u8>>,
}

impl DatagramQueue {
    /// Queue the given datagrams in order
    pub fn new<I>(datagrams: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            datagrams: datagrams.into_iter().collect(),
        }
    }

    /// Append one more datagram
    pub fn push(&mut self, datagram: Vec<u8>) {
        self.datagrams.push_back(datagram);
    }

    /// Datagrams not yet delivered
    pub fn remaining(&self) -> usize {
        self.datagrams.len()
    }
}

impl Transport for DatagramQueue {
    fn framing(&self) -> Framing {
        Framing::Datagram
    }

    fn read_into(&mut self, buf: &mut BytesMut, max: usize) -> io::Result<usize> {
        let datagram = self
            .datagrams
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let n = datagram.len().min(max);
        buf.extend_from_slice(&datagram[..n]);
        Ok(n)
    }
}
