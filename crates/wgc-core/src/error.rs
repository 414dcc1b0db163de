//! Error types for WgConf
//!
//! Provides a unified error handling strategy using thiserror.

use thiserror::Error;

/// Result type alias for WgConf operations
pub type Result<T> = std::result::Result<T, WgError>;

/// Unified error type for all WgConf operations
#[derive(Error, Debug)]
pub enum WgError {
    // ─────────────────────────────────────────────────────────────
    // Addressing Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("No free address left in {}", pools.join(", "))]
    AddressPoolExhausted { pools: Vec<String> },

    #[error("Address already assigned to another peer: {0}")]
    AddressConflict(String),

    // ─────────────────────────────────────────────────────────────
    // Peer Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Peer already registered: {0}")]
    DuplicatePeer(String),

    #[error("Endpoint required to export client config for peer {0}")]
    EndpointRequired(String),

    #[error("Private key of peer {0} is not known")]
    PrivateKeyUnavailable(String),

    // ─────────────────────────────────────────────────────────────
    // Key Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Public key {expected} does not match derived key {derived}")]
    KeyMismatch { expected: String, derived: String },

    // ─────────────────────────────────────────────────────────────
    // Parse / Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WgError {
    fn from(err: serde_json::Error) -> Self {
        WgError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for WgError {
    fn from(err: toml::de::Error) -> Self {
        WgError::ConfigError(err.to_string())
    }
}

impl From<toml::ser::Error> for WgError {
    fn from(err: toml::ser::Error) -> Self {
        WgError::Serialization(err.to_string())
    }
}
