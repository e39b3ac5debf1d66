// ============================================
// File: crates/keyline-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Main server implementation that coordinates all components and
//! manages the server lifecycle.
//!
//! ## Main Functionality
//! - `Server`: Main server struct and lifecycle management
//! - Accept loop spawning one task per connection
//! - Idle session cleanup
//! - Graceful shutdown handling
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────────────────┐  ┌──────────────┐         │
//! │  │ Accept Task                  │  │ Cleanup Task │         │
//! │  │                              │  │              │         │
//! │  │ listener.accept()            │  │ Expire idle  │         │
//! │  │   │                          │  │ sessions     │         │
//! │  │   ▼                          │  └──────────────┘         │
//! │  │ ┌──────────────────────────┐ │                           │
//! │  │ │ ConnectionHandler × N    │ │                           │
//! │  │ │ SecureSession            │ │                           │
//! │  │ │ AccountDispatcher        │ │                           │
//! │  │ └──────────────────────────┘ │                           │
//! │  └──────────────────────────────┘                           │
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │                    Services                          │   │
//! │  │      ┌────────────────┐   ┌────────────────┐        │   │
//! │  │      │ SessionManager │   │ AccountService │        │   │
//! │  │      └────────────────┘   └────────────────┘        │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Graceful shutdown waits up to 5 seconds per task group
//! - All services are Arc-wrapped for sharing
//! - Connections over the session limit are closed right after accept
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use keyline_core::session::ChannelSuite;
use keyline_transport::{FrameListener, FrameTransport, TcpFrameListener};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::handlers::ConnectionHandler;
use crate::services::{AccountService, InMemoryAccounts, SessionManager};

/// How long shutdown waits for each task group.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================
// Server
// ============================================

/// Main Keyline server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Start with `server.run().await` (or `serve` on a bound listener)
/// 3. Shutdown via `shutdown()` or Ctrl+C
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Curve and cipher for every session.
    suite: ChannelSuite,
    /// Live connection registry.
    sessions: Arc<SessionManager>,
    /// Account store.
    accounts: Arc<dyn AccountService>,
    /// Shutdown flag.
    shutdown: Arc<AtomicBool>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a server with an in-memory account store.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let accounts = InMemoryAccounts::from_config(&config.accounts);
        Self::with_accounts(config, Arc::new(accounts))
    }

    /// Creates a server backed by the given account store.
    #[must_use]
    pub fn with_accounts(config: ServerConfig, accounts: Arc<dyn AccountService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let sessions = Arc::new(SessionManager::new(
            config.max_sessions(),
            config.idle_timeout(),
        ));

        Self {
            suite: config.channel_suite(),
            config,
            sessions,
            accounts,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Live connection registry.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Errors
    /// Returns error if the listener cannot be bound.
    pub async fn run(&self) -> Result<()> {
        info!("Starting Keyline server v{}", env!("CARGO_PKG_VERSION"));

        let listener = TcpFrameListener::bind_addr(
            self.config.listen_addr(),
            self.config.limits.max_frame_len,
        )
        .await?;

        self.serve(listener).await
    }

    /// Serves connections from `listener` until shutdown.
    ///
    /// # Errors
    /// Returns error if the listener has no local address.
    pub async fn serve<L>(&self, listener: L) -> Result<()>
    where
        L: FrameListener + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!(
            listen_addr = %local_addr,
            curve = self.suite.curve().name(),
            max_sessions = self.config.max_sessions(),
            "Server listening"
        );

        let mut tasks: Vec<(&str, JoinHandle<()>)> = Vec::new();
        tasks.push(("accept", self.spawn_accept_task(listener)));
        tasks.push(("cleanup", self.spawn_cleanup_task()));

        info!("Server started successfully");

        // Wait for shutdown signal
        self.wait_for_shutdown().await;

        // Shutdown
        info!("Shutting down server...");
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        // Wait for tasks to complete
        for (name, task) in tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE * 2, task).await {
                Ok(Ok(())) => debug!("Task '{}' completed", name),
                Ok(Err(e)) => warn!("Task '{}' failed: {}", name, e),
                Err(_) => warn!("Task '{}' timed out during shutdown", name),
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Runs one connection to completion on the current task.
    ///
    /// # Errors
    /// `SessionLimitReached` if the registry is full, or the error that
    /// ended the connection.
    pub async fn serve_connection<T>(&self, transport: T, peer: Option<SocketAddr>) -> Result<()>
    where
        T: FrameTransport + 'static,
    {
        serve_connection(
            transport,
            peer,
            &self.sessions,
            &self.suite,
            &self.accounts,
            self.shutdown_tx.subscribe(),
        )
        .await
    }

    /// Spawns the accept loop.
    fn spawn_accept_task<L>(&self, listener: L) -> JoinHandle<()>
    where
        L: FrameListener + 'static,
    {
        let sessions = Arc::clone(&self.sessions);
        let accounts = Arc::clone(&self.accounts);
        let suite = self.suite.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let shutdown_tx = self.shutdown_tx.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut connections = JoinSet::new();

            loop {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Accept task received shutdown signal");
                        break;
                    }
                    Some(joined) = connections.join_next(), if !connections.is_empty() => {
                        if let Err(e) = joined {
                            warn!("Connection task panicked: {}", e);
                        }
                    }
                    accepted = listener.accept() => {
                        let (conn, info) = match accepted {
                            Ok(accepted) => accepted,
                            Err(e) => {
                                warn!("Accept error: {}", e);
                                continue;
                            }
                        };

                        let sessions = Arc::clone(&sessions);
                        let accounts = Arc::clone(&accounts);
                        let suite = suite.clone();
                        let conn_shutdown = shutdown_tx.subscribe();

                        connections.spawn(async move {
                            let result = serve_connection(
                                conn,
                                Some(info.peer),
                                &sessions,
                                &suite,
                                &accounts,
                                conn_shutdown,
                            )
                            .await;
                            match result {
                                Err(e) if e.is_session_error() => {
                                    warn!(peer = %info.peer, error = %e, "Rejected connection");
                                }
                                Err(e) => {
                                    debug!(peer = %info.peer, error = %e, "Connection finished");
                                }
                                Ok(()) => {}
                            }
                        });
                    }
                }
            }

            // Connections registered after the broadcast still need a nudge
            sessions.close_all();

            let drain = async { while connections.join_next().await.is_some() {} };
            if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
                warn!(
                    remaining = connections.len(),
                    "Connections did not finish in time, aborting"
                );
                connections.abort_all();
            }

            debug!("Accept task exiting");
        })
    }

    /// Spawns the session cleanup task.
    fn spawn_cleanup_task(&self) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let shutdown = Arc::clone(&self.shutdown);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = cleanup_interval(self.config.idle_timeout());

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Cleanup task received shutdown signal");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        if shutdown.load(Ordering::SeqCst) {
                            break;
                        }

                        let expired = sessions.cleanup_expired();

                        debug!(
                            expired = expired.len(),
                            sessions = sessions.count(),
                            keyed = sessions.keyed_count(),
                            "Cleanup cycle complete"
                        );
                    }
                }
            }

            debug!("Cleanup task exiting");
        })
    }

    /// Waits for shutdown signal (Ctrl+C or programmatic).
    async fn wait_for_shutdown(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.is_shutting_down() {
            return;
        }

        tokio::select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => {
                    error!("Failed to listen for Ctrl+C: {}", e);
                    let _ = shutdown_rx.recv().await;
                }
            },
            _ = shutdown_rx.recv() => info!("Shutdown requested"),
        }
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen_addr", &self.config.network.listen_addr)
            .field("curve", &self.config.crypto.curve)
            .field("sessions", &self.sessions.count())
            .finish_non_exhaustive()
    }
}

// ============================================
// Helpers
// ============================================

/// Registers a connection, runs it and removes it again.
async fn serve_connection<T>(
    transport: T,
    peer: Option<SocketAddr>,
    sessions: &SessionManager,
    suite: &ChannelSuite,
    accounts: &Arc<dyn AccountService>,
    shutdown_rx: broadcast::Receiver<()>,
) -> Result<()>
where
    T: FrameTransport + 'static,
{
    let record = match sessions.create(peer) {
        Ok(record) => record,
        Err(e) => {
            let _ = transport.shutdown().await;
            return Err(e);
        }
    };

    let id = record.id.clone();
    let handler = ConnectionHandler::new(transport, record, suite, Arc::clone(accounts));
    let result = handler.run(shutdown_rx).await;
    sessions.remove(&id);
    result
}

/// Sweep often enough that idle sessions overstay by at most a quarter.
fn cleanup_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use keyline_transport::{MemoryTransport, DEFAULT_MAX_FRAME_LEN};

    fn small_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.limits.max_connections = 1;
        config
    }

    #[test]
    fn test_cleanup_interval_bounds() {
        assert_eq!(cleanup_interval(Duration::from_secs(1)), Duration::from_secs(1));
        assert_eq!(cleanup_interval(Duration::from_secs(40)), Duration::from_secs(10));
        assert_eq!(cleanup_interval(Duration::from_secs(3600)), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_session_limit_rejects_extra_connection() {
        let server = Arc::new(Server::new(small_config()));

        let (first, _first_peer) = MemoryTransport::pair(DEFAULT_MAX_FRAME_LEN);
        let running = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve_connection(first, None).await })
        };

        while server.sessions().is_empty() {
            tokio::task::yield_now().await;
        }

        let (second, second_peer) = MemoryTransport::pair(DEFAULT_MAX_FRAME_LEN);
        let err = server.serve_connection(second, None).await.unwrap_err();
        assert!(err.is_session_error());
        assert_eq!(second_peer.recv_frame().await.unwrap(), None);

        server.shutdown();
        running.await.unwrap().unwrap();
        assert!(server.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let server = Arc::new(Server::new(ServerConfig::default()));
        let listener = TcpFrameListener::bind("127.0.0.1:0", DEFAULT_MAX_FRAME_LEN)
            .await
            .unwrap();

        let serving = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(listener).await })
        };

        tokio::task::yield_now().await;
        server.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(15), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(server.is_shutting_down());
    }
}
