// ============================================
// File: crates/keyline-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Creation Reason
//! The session layer exchanges whole text frames. These traits hide
//! whether the frames travel over TCP or an in-memory pipe.
//!
//! ## Main Functionality
//! - `FrameTransport`: send/receive one frame at a time
//! - `FrameListener`: accept new connections
//! - `ConnectionInfo`: metadata about an accepted connection
//!
//! ## ⚠️ Important Note for Next Developer
//! - Methods take `&self` so one task can read while another writes
//! - Implementations must be Send + Sync for use in async contexts
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;

/// Default upper bound on a single frame, excluding the line terminator.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

// ============================================
// ConnectionInfo
// ============================================

/// Metadata about an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    /// Remote address.
    pub peer: SocketAddr,
    /// When the connection was accepted.
    pub accepted_at: Instant,
}

impl ConnectionInfo {
    /// Creates a new `ConnectionInfo` stamped now.
    #[must_use]
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            accepted_at: Instant::now(),
        }
    }

    /// Time since the connection was accepted.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.accepted_at.elapsed()
    }
}

// ============================================
// FrameTransport Trait
// ============================================

/// A bidirectional stream of text frames.
///
/// # Example
/// ```ignore
/// async fn echo<T: FrameTransport>(transport: &T) -> Result<()> {
///     while let Some(frame) = transport.recv_frame().await? {
///         transport.send_frame(&frame).await?;
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// Receives the next frame.
    ///
    /// # Returns
    /// `Ok(None)` once the peer has closed the connection.
    ///
    /// # Errors
    /// `FrameTooLarge` / `InvalidFrame` on framing violations,
    /// `ShuttingDown` after shutdown.
    async fn recv_frame(&self) -> Result<Option<String>>;

    /// Sends one frame.
    ///
    /// # Errors
    /// `InvalidFrame` if the frame contains a line terminator,
    /// `FrameTooLarge` if it exceeds the limit.
    async fn send_frame(&self, frame: &str) -> Result<()>;

    /// Remote address, if the transport has one.
    fn peer_addr(&self) -> Option<SocketAddr>;

    /// Closes the write side and rejects further operations.
    ///
    /// # Errors
    /// Returns error if the underlying close fails.
    async fn shutdown(&self) -> Result<()>;

    /// Returns `true` until `shutdown` is called.
    fn is_active(&self) -> bool;
}

// ============================================
// FrameListener Trait
// ============================================

/// Accepts incoming frame connections.
#[async_trait]
pub trait FrameListener: Send + Sync {
    /// Connection type produced by `accept`.
    type Connection: FrameTransport + 'static;

    /// Waits for the next connection.
    ///
    /// # Errors
    /// Returns error if accepting fails.
    async fn accept(&self) -> Result<(Self::Connection, ConnectionInfo)>;

    /// Address the listener is bound to.
    ///
    /// # Errors
    /// Returns error if the address cannot be determined.
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// Checks an outgoing frame against the framing rules.
///
/// # Errors
/// `InvalidFrame` for embedded line terminators, `FrameTooLarge` when
/// longer than `max_frame_len`.
pub fn check_outgoing(frame: &str, max_frame_len: usize) -> Result<()> {
    use crate::error::TransportError;

    if frame.contains(['\n', '\r']) {
        return Err(TransportError::invalid_frame("frame contains a line terminator"));
    }
    if frame.len() > max_frame_len {
        return Err(TransportError::FrameTooLarge {
            limit: max_frame_len,
        });
    }
    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn test_connection_info() {
        let addr: SocketAddr = "127.0.0.1:7878".parse().unwrap();
        let info = ConnectionInfo::new(addr);
        assert_eq!(info.peer, addr);
        assert!(info.age() < Duration::from_secs(1));
    }

    #[test]
    fn test_check_outgoing() {
        assert!(check_outgoing("0,2", 16).is_ok());
        assert!(matches!(
            check_outgoing("0,2\n3", 16),
            Err(TransportError::InvalidFrame { .. })
        ));
        assert!(matches!(
            check_outgoing("0,2\r", 16),
            Err(TransportError::InvalidFrame { .. })
        ));
        assert!(matches!(
            check_outgoing(&"a".repeat(17), 16),
            Err(TransportError::FrameTooLarge { limit: 16 })
        ));
    }
}
