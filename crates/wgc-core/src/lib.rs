//! WgConf Core Library
//!
//! This crate models WireGuard tunnel configurations.
//! It includes:
//! - The interface/peer data model with key pairs
//! - Canonical config rendering and a lenient parser
//! - Deterministic peer address allocation over CIDR pools
//! - A sidecar store for peer secrets
//! - Tool settings and a lock-guarded shared tunnel handle

pub mod address;
pub mod brand;
pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod keys;
pub mod peer;
pub mod secrets;
pub mod shared;
pub mod tunnel;

pub use address::{enumerate_hosts, next_free, Hosts};
pub use config::{KeyBackend, WgConfSettings};
pub use error::{Result, WgError};
pub use keys::{
    KeyDerivation, KeyFactory, KeyPair, OsRandom, RandomSource, WgToolDerivation, X25519Derivation,
};
pub use peer::{Peer, PeerMap, PeerParams, DEFAULT_ALLOWED_IPS};
pub use secrets::{PeerSecrets, SecretStore};
pub use shared::SharedTunnel;
pub use tunnel::{
    ClientOverrides, PeerSummary, TunnelConfig, TunnelParams, TunnelSummary, DEFAULT_LISTEN_PORT,
};
