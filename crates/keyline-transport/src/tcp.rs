// ============================================
// File: crates/keyline-transport/src/tcp.rs
// ============================================
//! # TCP Line Transport
//!
//! ## Creation Reason
//! Carries Keyline frames over TCP, one frame per line.
//!
//! ## Main Functionality
//! - `TcpFrameListener`: bound listener producing framed connections
//! - `TcpFrameTransport`: newline-delimited frames on one TCP stream
//!
//! ## Wire Format
//! ```text
//! <frame bytes> '\n'      ('\r\n' is accepted on receive)
//! ```
//!
//! ## Design Choices
//! - Uses SO_REUSEADDR for quick rebinding after restart
//! - Reads are bounded by `max_frame_len`; a longer line is a framing
//!   error and the connection must be dropped
//! - Read and write halves sit behind separate async mutexes
//!
//! ## ⚠️ Important Note for Next Developer
//! - A final line without terminator before EOF is still delivered
//!
//! ## Last Modified
//! v0.1.0 - Initial TCP transport implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::traits::{check_outgoing, ConnectionInfo, FrameListener, FrameTransport};

/// Pending connection backlog for the listening socket.
const LISTEN_BACKLOG: i32 = 1024;

fn parse_addr(addr: &str) -> Result<SocketAddr> {
    addr.parse().map_err(|_| TransportError::InvalidAddress {
        addr: addr.to_string(),
    })
}

// ============================================
// TcpFrameListener
// ============================================

/// TCP listener that hands out line-framed connections.
///
/// # Example
/// ```ignore
/// use keyline_transport::{FrameListener, TcpFrameListener};
///
/// let listener = TcpFrameListener::bind("0.0.0.0:7878", 64 * 1024).await?;
/// let (conn, info) = listener.accept().await?;
/// ```
pub struct TcpFrameListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    max_frame_len: usize,
}

impl TcpFrameListener {
    /// Binds a listener to the given address string.
    ///
    /// # Errors
    /// - `InvalidAddress`: If the address cannot be parsed
    /// - `AddressInUse`: If address is already in use
    /// - `BindFailed`: If binding fails otherwise
    pub async fn bind(addr: impl AsRef<str>, max_frame_len: usize) -> Result<Self> {
        Self::bind_addr(parse_addr(addr.as_ref())?, max_frame_len).await
    }

    /// Binds a listener to the given socket address.
    ///
    /// # Errors
    /// Returns error if binding fails.
    pub async fn bind_addr(addr: SocketAddr, max_frame_len: usize) -> Result<Self> {
        info!("Binding TCP listener to {}", addr);

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| TransportError::io("creating TCP socket", e))?;

        socket
            .set_reuse_address(true)
            .map_err(|e| TransportError::io("setting SO_REUSEADDR", e))?;

        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::io("setting non-blocking", e))?;

        socket.bind(&addr.into()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddressInUse { addr }
            } else {
                TransportError::bind_failed(addr, e.to_string())
            }
        })?;

        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| TransportError::bind_failed(addr, e.to_string()))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| TransportError::io("converting to Tokio listener", e))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TransportError::io("getting local address", e))?;

        info!("TCP listener bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            max_frame_len,
        })
    }
}

#[async_trait]
impl FrameListener for TcpFrameListener {
    type Connection = TcpFrameTransport;

    async fn accept(&self) -> Result<(TcpFrameTransport, ConnectionInfo)> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| TransportError::io("accepting connection", e))?;

        debug!(peer = %peer, "Accepted connection");

        let transport = TcpFrameTransport::from_stream(stream, self.max_frame_len)?;
        Ok((transport, ConnectionInfo::new(peer)))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }
}

impl std::fmt::Debug for TcpFrameListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpFrameListener")
            .field("local_addr", &self.local_addr)
            .field("max_frame_len", &self.max_frame_len)
            .finish()
    }
}

// ============================================
// TcpFrameTransport
// ============================================

/// One TCP connection carrying newline-delimited frames.
pub struct TcpFrameTransport {
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
    peer_addr: SocketAddr,
    max_frame_len: usize,
    shutdown: AtomicBool,
}

impl TcpFrameTransport {
    /// Connects to a remote listener.
    ///
    /// # Errors
    /// `InvalidAddress` or `ConnectFailed`.
    pub async fn connect(addr: impl AsRef<str>, max_frame_len: usize) -> Result<Self> {
        let addr_str = addr.as_ref();
        let socket_addr = parse_addr(addr_str)?;

        let stream = TcpStream::connect(socket_addr)
            .await
            .map_err(|e| TransportError::connect_failed(addr_str, e.to_string()))?;

        info!("Connected to {}", socket_addr);
        Self::from_stream(stream, max_frame_len)
    }

    /// Wraps an established stream.
    ///
    /// # Errors
    /// Returns error if socket options cannot be applied.
    pub fn from_stream(stream: TcpStream, max_frame_len: usize) -> Result<Self> {
        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::io("setting TCP_NODELAY", e))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|e| TransportError::io("getting peer address", e))?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: Mutex::new(BufReader::new(read_half)),
            writer: Mutex::new(write_half),
            peer_addr,
            max_frame_len,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Checks if the transport has been shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Configured frame limit.
    #[must_use]
    pub const fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

/// Strips the line terminator and validates the frame text.
fn finish_line(mut line: Vec<u8>) -> Result<String> {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    String::from_utf8(line).map_err(|_| TransportError::invalid_frame("frame is not valid UTF-8"))
}

#[async_trait]
impl FrameTransport for TcpFrameTransport {
    async fn recv_frame(&self) -> Result<Option<String>> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }

        let mut reader = self.reader.lock().await;
        let mut line = Vec::new();
        // Room for the frame, an optional '\r' and the '\n'
        let limit = self.max_frame_len as u64 + 2;

        let read = (&mut *reader)
            .take(limit)
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| TransportError::ReceiveFailed {
                reason: e.to_string(),
            })?;

        if read == 0 {
            debug!(peer = %self.peer_addr, "Peer closed connection");
            return Ok(None);
        }

        let frame = finish_line(line)?;
        if frame.len() > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                limit: self.max_frame_len,
            });
        }

        trace!(peer = %self.peer_addr, len = frame.len(), "Received frame");
        Ok(Some(frame))
    }

    async fn send_frame(&self, frame: &str) -> Result<()> {
        if self.is_shutdown() {
            return Err(TransportError::ShuttingDown);
        }
        check_outgoing(frame, self.max_frame_len)?;

        let mut line = Vec::with_capacity(frame.len() + 1);
        line.extend_from_slice(frame.as_bytes());
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })?;
        writer.flush().await.map_err(|e| TransportError::SendFailed {
            reason: e.to_string(),
        })?;

        trace!(peer = %self.peer_addr, len = frame.len(), "Sent frame");
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer_addr)
    }

    async fn shutdown(&self) -> Result<()> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!(peer = %self.peer_addr, "Shutting down TCP transport");

        let mut writer = self.writer.lock().await;
        match writer.shutdown().await {
            Ok(()) => Ok(()),
            // Peer already gone
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::io("closing write half", e)),
        }
    }

    fn is_active(&self) -> bool {
        !self.is_shutdown()
    }
}

impl std::fmt::Debug for TcpFrameTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpFrameTransport")
            .field("peer_addr", &self.peer_addr)
            .field("max_frame_len", &self.max_frame_len)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
