// ============================================
// File: crates/keyline-transport/src/memory.rs
// ============================================
//! # In-Memory Frame Transport
//!
//! ## Creation Reason
//! Lets two endpoints exchange frames inside one process, for tests and
//! for wiring a client and a server together without sockets.
//!
//! ## Main Functionality
//! - `MemoryTransport::pair`: two connected ends
//! - Bounded queues per direction
//! - Closing one end delivers end-of-stream to the other
//!
//! ## Usage in Tests
//! ```ignore
//! let (a, b) = MemoryTransport::pair(4096);
//! a.send_frame("0,ab,cd").await?;
//! assert_eq!(b.recv_frame().await?.as_deref(), Some("0,ab,cd"));
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Each direction has a single reader; `Notify::notify_one` relies
//!   on that
//!
//! ## Last Modified
//! v0.1.0 - Initial in-memory transport

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{Result, TransportError};
use crate::traits::{check_outgoing, FrameTransport};

// ============================================
// Constants
// ============================================

/// Maximum number of frames queued in one direction.
const MAX_QUEUE_SIZE: usize = 1000;

// ============================================
// Pipe
// ============================================

/// One direction of a memory connection.
#[derive(Default)]
struct Pipe {
    queue: Mutex<VecDeque<String>>,
    closed: AtomicBool,
    notify: Notify,
}

impl Pipe {
    fn push(&self, frame: String) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed {
                reason: "peer closed".into(),
            });
        }
        let mut queue = self.queue.lock();
        if queue.len() >= MAX_QUEUE_SIZE {
            return Err(TransportError::SendFailed {
                reason: "queue full".into(),
            });
        }
        queue.push_back(frame);
        drop(queue);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Option<String> {
        loop {
            if let Some(frame) = self.queue.lock().pop_front() {
                return Some(frame);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.notify.notified().await;
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

// ============================================
// MemoryTransport
// ============================================

/// One end of an in-memory frame connection.
pub struct MemoryTransport {
    inbound: Arc<Pipe>,
    outbound: Arc<Pipe>,
    max_frame_len: usize,
    shutdown: AtomicBool,
}

impl MemoryTransport {
    /// Creates two connected ends.
    #[must_use]
    pub fn pair(max_frame_len: usize) -> (Self, Self) {
        let a_to_b = Arc::new(Pipe::default());
        let b_to_a = Arc::new(Pipe::default());
        let a = Self {
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
            max_frame_len,
            shutdown: AtomicBool::new(false),
        };
        let b = Self {
            inbound: a_to_b,
            outbound: b_to_a,
            max_frame_len,
            shutdown: AtomicBool::new(false),
        };
        (a, b)
    }

    /// Number of frames waiting to be received on this end.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.inbound.pending()
    }
}

#[async_trait]
impl FrameTransport for MemoryTransport {
    async fn recv_frame(&self) -> Result<Option<String>> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(TransportError::ShuttingDown);
        }
        Ok(self.inbound.pop().await)
    }

    async fn send_frame(&self, frame: &str) -> Result<()> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(TransportError::ShuttingDown);
        }
        check_outgoing(frame, self.max_frame_len)?;
        self.outbound.push(frame.to_string())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::Release);
        self.outbound.close();
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.outbound.close();
        self.inbound.close();
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("pending_frames", &self.pending_frames())
            .field("max_frame_len", &self.max_frame_len)
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_exchanges_frames() {
        let (a, b) = MemoryTransport::pair(64);

        a.send_frame("one").await.unwrap();
        a.send_frame("two").await.unwrap();
        assert_eq!(b.pending_frames(), 2);
        assert_eq!(b.recv_frame().await.unwrap().as_deref(), Some("one"));
        assert_eq!(b.recv_frame().await.unwrap().as_deref(), Some("two"));

        b.send_frame("back").await.unwrap();
        assert_eq!(a.recv_frame().await.unwrap().as_deref(), Some("back"));
        assert!(a.peer_addr().is_none());
    }

    #[tokio::test]
    async fn test_recv_waits_for_send() {
        let (a, b) = MemoryTransport::pair(64);
        let reader = tokio::spawn(async move { b.recv_frame().await.unwrap() });
        tokio::task::yield_now().await;
        a.send_frame("late").await.unwrap();
        assert_eq!(reader.await.unwrap().as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_shutdown_ends_peer_stream() {
        let (a, b) = MemoryTransport::pair(64);
        a.send_frame("last").await.unwrap();
        a.shutdown().await.unwrap();

        assert!(!a.is_active());
        assert!(matches!(a.send_frame("x").await, Err(TransportError::ShuttingDown)));
        // Queued frames drain before end-of-stream
        assert_eq!(b.recv_frame().await.unwrap().as_deref(), Some("last"));
        assert_eq!(b.recv_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_closes_both_directions() {
        let (a, b) = MemoryTransport::pair(64);
        drop(a);
        assert_eq!(b.recv_frame().await.unwrap(), None);
        assert!(matches!(
            b.send_frame("x").await,
            Err(TransportError::SendFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_frame_limit() {
        let (a, _b) = MemoryTransport::pair(4);
        assert!(matches!(
            a.send_frame("12345").await,
            Err(TransportError::FrameTooLarge { limit: 4 })
        ));
    }
}
