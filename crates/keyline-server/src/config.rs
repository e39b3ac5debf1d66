// ============================================
// File: crates/keyline-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the Keyline server, loaded
//! from a TOML file and validated before startup.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Defaults that run out of the box
//!
//! ## Configuration Sections
//! - `network`: TCP listen address
//! - `crypto`: curve and cipher suite
//! - `limits`: connection, idle and frame limits
//! - `accounts`: username/password policy
//! - `logging`: Log level
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:7878"
//!
//! [crypto]
//! curve = "secp256k1"
//! cipher = "aes-128-cbc"
//!
//! [limits]
//! max_connections = 1000
//! idle_timeout_secs = 300
//! max_frame_len = 65536
//!
//! [accounts]
//! username_min = 3
//! username_max = 32
//! password_min = 8
//! password_max = 64
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require server restart
//! - Client and server must agree on `crypto`; nothing negotiates it
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use keyline_core::{CipherSuite, CurveKind};
use keyline_core::session::ChannelSuite;

use crate::error::{Result, ServerError};
use crate::services::accounts::DEFAULT_MAX_ACCOUNTS;

/// Smallest frame limit that still fits a key share on the widest curve.
pub const MIN_FRAME_LEN: usize = 256;

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Channel cryptography.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Account policy.
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the text cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        self.accounts.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns listen address.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        self.network.listen_addr
    }

    /// Builds the channel suite from the `crypto` section.
    #[must_use]
    pub fn channel_suite(&self) -> ChannelSuite {
        ChannelSuite::from_kinds(self.crypto.curve, self.crypto.cipher)
    }

    /// Returns max concurrent sessions.
    #[must_use]
    pub const fn max_sessions(&self) -> usize {
        self.limits.max_connections
    }

    /// Idle timeout as a duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.idle_timeout_secs)
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 7878))
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

// ============================================
// CryptoConfig
// ============================================

/// Curve and cipher used by every session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Elliptic curve for the key exchange.
    #[serde(default)]
    pub curve: CurveKind,

    /// Block cipher for keyed frames.
    #[serde(default)]
    pub cipher: CipherSuite,
}

// ============================================
// LimitsConfig
// ============================================

/// Resource limits configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Seconds without traffic before a connection is dropped.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Longest accepted frame in bytes.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

fn default_max_connections() -> usize {
    1000
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_max_frame_len() -> usize {
    keyline_transport::DEFAULT_MAX_FRAME_LEN
}

impl LimitsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(ServerError::config_invalid(
                "limits.max_connections",
                "must be greater than 0",
            ));
        }

        if self.idle_timeout_secs == 0 {
            return Err(ServerError::config_invalid(
                "limits.idle_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.max_frame_len < MIN_FRAME_LEN {
            return Err(ServerError::config_invalid(
                "limits.max_frame_len",
                format!("must be at least {MIN_FRAME_LEN}"),
            ));
        }

        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

// ============================================
// AccountsConfig
// ============================================

/// Account store limits, username and password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Most accounts the in-memory store holds.
    #[serde(default = "default_max_accounts")]
    pub max_accounts: usize,

    /// Shortest username.
    #[serde(default = "default_username_min")]
    pub username_min: usize,
    /// Longest username.
    #[serde(default = "default_username_max")]
    pub username_max: usize,
    /// Shortest password.
    #[serde(default = "default_password_min")]
    pub password_min: usize,
    /// Longest password.
    #[serde(default = "default_password_max")]
    pub password_max: usize,
    /// Argon2id memory cost in KiB.
    #[serde(default = "default_hash_memory_kib")]
    pub hash_memory_kib: u32,
    /// Argon2id passes.
    #[serde(default = "default_hash_iterations")]
    pub hash_iterations: u32,
}

fn default_max_accounts() -> usize {
    DEFAULT_MAX_ACCOUNTS
}

fn default_username_min() -> usize {
    3
}

fn default_username_max() -> usize {
    32
}

fn default_password_min() -> usize {
    8
}

fn default_password_max() -> usize {
    64
}

fn default_hash_memory_kib() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_hash_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

impl AccountsConfig {
    fn validate(&self) -> Result<()> {
        if self.max_accounts == 0 {
            return Err(ServerError::config_invalid(
                "accounts.max_accounts",
                "must be greater than 0",
            ));
        }

        if self.username_min == 0 || self.username_min > self.username_max {
            return Err(ServerError::config_invalid(
                "accounts.username_min",
                "must be between 1 and username_max",
            ));
        }

        if self.password_min == 0 || self.password_min > self.password_max {
            return Err(ServerError::config_invalid(
                "accounts.password_min",
                "must be between 1 and password_max",
            ));
        }

        if self.hash_iterations == 0 {
            return Err(ServerError::config_invalid(
                "accounts.hash_iterations",
                "must be greater than 0",
            ));
        }

        argon2::Params::new(
            self.hash_memory_kib,
            self.hash_iterations,
            argon2::Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| ServerError::config_invalid("accounts.hash_memory_kib", e.to_string()))?;

        Ok(())
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            max_accounts: default_max_accounts(),
            username_min: default_username_min(),
            username_max: default_username_max(),
            password_min: default_password_min(),
            password_max: default_password_max(),
            hash_memory_kib: default_hash_memory_kib(),
            hash_iterations: default_hash_iterations(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================
