//! CLI Command Definitions
//!
//! Defines the command-line interface using clap.

pub mod export;
pub mod init;
pub mod keys;
pub mod peer;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use wgc_core::{brand, SecretStore, TunnelConfig, WgConfSettings, DEFAULT_LISTEN_PORT};

/// WgConf - WireGuard tunnel configuration manager
///
/// Generates, edits and exports wg-quick style configurations and hands
/// out non-conflicting peer addresses from the interface's address pool.
#[derive(Parser, Debug)]
#[command(name = brand::BIN_NAME)]
#[command(author, version, about = brand::DESCRIPTION, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Tunnel configuration file (defaults to the path in settings)
    #[arg(short, long, global = true, value_name = "FILE", env = "WGCONF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Settings file
    #[arg(long, global = true, value_name = "FILE", env = "WGCONF_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new tunnel configuration
    Init(InitArgs),

    /// Generate a fresh key triple
    Genkey {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive the public key for a private key
    Pubkey {
        #[arg(value_name = "PRIVATE_KEY")]
        private_key: String,
    },

    /// Add a peer, allocating the next free address
    #[command(visible_alias = "add")]
    AddPeer(AddPeerArgs),

    /// Remove a peer
    #[command(visible_alias = "rm")]
    RemovePeer {
        #[arg(value_name = "PUBLIC_KEY")]
        public_key: String,
    },

    /// Replace a peer's keys
    Rotate {
        #[arg(value_name = "PUBLIC_KEY")]
        public_key: String,
    },

    /// Export a client configuration for a peer
    Export(ExportArgs),

    /// Print the tunnel configuration
    Show {
        /// Print a JSON summary without private keys
        #[arg(long)]
        json: bool,
    },

    /// Print the content fingerprint of the tunnel configuration
    Fingerprint,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Interface address pool(s) in CIDR notation
    #[arg(short, long, value_name = "CIDR", required = true, value_delimiter = ',')]
    pub address: Vec<String>,

    /// UDP listen port
    #[arg(
        short = 'p',
        long,
        default_value_t = DEFAULT_LISTEN_PORT,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub listen_port: u16,

    /// Use an existing private key instead of generating one
    #[arg(long, value_name = "KEY")]
    pub private_key: Option<String>,

    /// DNS server handed to clients
    #[arg(long)]
    pub dns: Option<String>,

    /// Interface MTU
    #[arg(long)]
    pub mtu: Option<u32>,

    #[arg(long, value_name = "CMD")]
    pub pre_up: Vec<String>,

    #[arg(long, value_name = "CMD")]
    pub post_up: Vec<String>,

    #[arg(long, value_name = "CMD")]
    pub pre_down: Vec<String>,

    #[arg(long, value_name = "CMD")]
    pub post_down: Vec<String>,

    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct AddPeerArgs {
    /// Allowed IPs instead of an allocated address
    #[arg(long, value_name = "CIDR", value_delimiter = ',')]
    pub allowed_ips: Vec<String>,

    /// Persistent keepalive in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub keepalive: Option<u32>,

    /// Peer endpoint (host:port)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Use an existing private key for the peer
    #[arg(long, value_name = "KEY", conflicts_with = "public_key")]
    pub private_key: Option<String>,

    /// Register a remote peer by public key only
    #[arg(long, value_name = "KEY")]
    pub public_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(value_name = "PUBLIC_KEY")]
    pub public_key: String,

    /// Server endpoint (host:port), defaults to the settings value
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Routes for the client instead of its own addresses
    #[arg(long, value_name = "CIDR", value_delimiter = ',')]
    pub allowed_ips: Vec<String>,

    /// Persistent keepalive in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub keepalive: Option<u32>,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Resolved settings plus the tunnel file location
#[derive(Debug)]
pub struct AppContext {
    pub settings: WgConfSettings,
    pub tunnel_path: PathBuf,
}

impl AppContext {
    /// Load settings and resolve the tunnel path
    pub fn load(settings_path: Option<&Path>, config: Option<&Path>) -> Result<Self> {
        let settings_path = settings_path
            .map(Path::to_path_buf)
            .unwrap_or_else(WgConfSettings::default_settings_path);

        let settings = WgConfSettings::load_or_default(&settings_path)
            .with_context(|| format!("Failed to read settings {}", settings_path.display()))?;

        let tunnel_path = config
            .map(Path::to_path_buf)
            .unwrap_or_else(|| settings.tunnel_path.clone());

        debug!("Using tunnel file {}", tunnel_path.display());
        Ok(Self { settings, tunnel_path })
    }

    /// Load the tunnel configuration
    pub fn load_tunnel(&self) -> Result<TunnelConfig> {
        TunnelConfig::load_with_keys(&self.tunnel_path, self.settings.key_factory())
            .with_context(|| format!("Failed to load {}", self.tunnel_path.display()))
    }

    /// Sidecar holding peer private and preshared keys
    pub fn secrets_path(&self) -> PathBuf {
        SecretStore::path_for(&self.tunnel_path)
    }

    /// Save the tunnel configuration
    pub fn save_tunnel(&self, config: &TunnelConfig) -> Result<()> {
        config
            .save(&self.tunnel_path)
            .with_context(|| format!("Failed to write {}", self.tunnel_path.display()))
    }
}
