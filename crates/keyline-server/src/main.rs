// ============================================
// File: crates/keyline-server/src/main.rs
// ============================================
//! # Keyline Server Entry Point
//!
//! ## Creation Reason
//! Main entry point for the Keyline binary. Handles CLI parsing,
//! logging setup, and either runs the server or acts as a one-shot
//! client.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Server execution
//! - One-shot account requests against a running server
//!
//! ## Usage
//! ```bash
//! keyline-server start -c /etc/keyline/server.toml
//! keyline-server validate
//!
//! keyline-server request create alice 'correct-horse'
//! keyline-server request verify alice 'correct-horse' <key>
//! keyline-server request update alice 'correct-horse' 'profile text'
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - VERIFY and UPDATE need a login on the same connection, so those
//!   commands take the password and log in first
//! - `request` reads the `crypto` section too; it must match the server
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keyline_core::protocol::LoginResult;
use keyline_server::{Client, Server, ServerConfig, ServerError};

// ============================================
// CLI Definition
// ============================================

/// Keyline secure account server
#[derive(Parser, Debug)]
#[command(name = "keyline-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/keyline/server.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/keyline/server.toml")]
        config: PathBuf,
    },

    /// Send one account request to a running server
    Request {
        /// Path to configuration file (for crypto settings)
        #[arg(short, long, default_value = "/etc/keyline/server.toml")]
        config: PathBuf,

        /// Server address; defaults to the configured listen address
        #[arg(short, long)]
        addr: Option<String>,

        #[command(subcommand)]
        operation: Operation,
    },
}

#[derive(Subcommand, Debug)]
enum Operation {
    /// Register a new account
    Create { username: String, password: String },

    /// Log in
    Login { username: String, password: String },

    /// Log in, then verify the account with its key
    Verify {
        username: String,
        password: String,
        key: String,
    },

    /// Log in, then store profile data
    Update {
        username: String,
        password: String,
        data: String,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging("info");

    // Execute command
    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
        Commands::Request {
            config,
            addr,
            operation,
        } => cmd_request(config, addr, operation).await,
    };

    // Handle errors
    if let Err(e) = result {
        error!("{}", e);
        if e
            .downcast_ref::<ServerError>()
            .is_some_and(ServerError::is_config_error)
        {
            error!("Check the file with `keyline-server validate -c <path>`");
        }
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the server.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    info!("Starting Keyline server...");

    // Load configuration
    let config = if config_path.exists() {
        ServerConfig::load(&config_path).await?
    } else {
        info!("Config file not found, using defaults");
        ServerConfig::default()
    };

    // Re-initialize logging with config level
    init_logging(&config.logging.level);

    info!("════════════════════════════════════════");
    info!("Listen:     {}", config.listen_addr());
    info!("Curve:      {}", config.crypto.curve);
    info!("Cipher:     {}", config.crypto.cipher);
    info!("════════════════════════════════════════");

    // Create and run server
    let server = Server::new(config);
    server.run().await?;

    Ok(())
}

/// Validates configuration file.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:     {}", config.listen_addr());
    println!();
    println!("Crypto:");
    println!("   Curve:      {}", config.crypto.curve);
    println!("   Cipher:     {}", config.crypto.cipher);
    println!();
    println!("Limits:");
    println!("   Max Connections:  {}", config.max_sessions());
    println!("   Idle Timeout:     {}s", config.limits.idle_timeout_secs);
    println!("   Max Frame:        {} bytes", config.limits.max_frame_len);
    println!();
    println!("Accounts:");
    println!("   Max Accounts: {}", config.accounts.max_accounts);
    println!(
        "   Hashing:    Argon2id, {} KiB, {} passes",
        config.accounts.hash_memory_kib, config.accounts.hash_iterations
    );
    println!(
        "   Username:   {}-{} chars",
        config.accounts.username_min, config.accounts.username_max
    );
    println!(
        "   Password:   {}-{} chars",
        config.accounts.password_min, config.accounts.password_max
    );
    println!();

    Ok(())
}

/// Runs one account operation against a server.
async fn cmd_request(
    config_path: PathBuf,
    addr: Option<String>,
    operation: Operation,
) -> anyhow::Result<()> {
    let config = load_or_default_config(&config_path).await?;
    let addr = addr.unwrap_or_else(|| dial_addr(config.listen_addr()).to_string());

    let mut client = Client::connect(
        &addr,
        &config.channel_suite(),
        config.limits.max_frame_len,
    )
    .await?;

    match operation {
        Operation::Create { username, password } => {
            let (result, key) = client.create(&username, &password).await?;
            println!("CREATE: {result}");
            if let Some(key) = key {
                println!("Verification key: {key}");
            }
        }
        Operation::Login { username, password } => {
            println!("LOGIN: {}", client.login(&username, &password).await?);
        }
        Operation::Verify {
            username,
            password,
            key,
        } => {
            let login = client.login(&username, &password).await?;
            if login_ok(login) {
                println!("VERIFY: {}", client.verify(&username, &key).await?);
            } else {
                println!("LOGIN: {login}");
            }
        }
        Operation::Update {
            username,
            password,
            data,
        } => {
            let login = client.login(&username, &password).await?;
            if login_ok(login) {
                println!("UPDATE: {}", client.update(&username, &data).await?);
            } else {
                println!("LOGIN: {login}");
            }
        }
    }

    client.close().await?;
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Loads config or returns default.
async fn load_or_default_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path).await?)
    } else {
        Ok(ServerConfig::default())
    }
}

/// A wildcard listen address is dialled on loopback.
fn dial_addr(listen: SocketAddr) -> SocketAddr {
    if listen.ip().is_unspecified() {
        SocketAddr::from(([127, 0, 0, 1], listen.port()))
    } else {
        listen
    }
}

/// Logged in, verified or not.
fn login_ok(result: LoginResult) -> bool {
    matches!(result, LoginResult::Success | LoginResult::Verify)
}
