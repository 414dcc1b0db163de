//! Peer Secret Store
//!
//! The canonical tunnel text names peers by public key only. Private and
//! preshared keys of peers created locally are kept in a TOML sidecar next
//! to the tunnel file so client configs can still be exported after a
//! reload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Extension replacing the tunnel file's own, `wg0.conf` -> `wg0.secrets.toml`
pub const SECRETS_EXTENSION: &str = "secrets.toml";

/// Secret half of one peer's key material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSecrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preshared_key: Option<String>,
}

impl PeerSecrets {
    /// Check whether there is anything worth storing
    pub fn is_empty(&self) -> bool {
        self.private_key.is_none() && self.preshared_key.is_none()
    }
}

/// Peer secrets keyed by public key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretStore {
    #[serde(default)]
    peers: BTreeMap<String, PeerSecrets>,
}

impl SecretStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Sidecar location for a tunnel file
    pub fn path_for(tunnel_path: impl AsRef<Path>) -> PathBuf {
        tunnel_path.as_ref().with_extension(SECRETS_EXTENSION)
    }

    /// Record the secrets of one peer, dropping empty entries
    pub fn insert(&mut self, public_key: impl Into<String>, secrets: PeerSecrets) {
        if !secrets.is_empty() {
            self.peers.insert(public_key.into(), secrets);
        }
    }

    /// Look up the secrets of one peer
    pub fn get(&self, public_key: &str) -> Option<&PeerSecrets> {
        self.peers.get(public_key)
    }

    /// Iterate entries ordered by public key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PeerSecrets)> {
        self.peers.iter().map(|(key, secrets)| (key.as_str(), secrets))
    }

    /// Number of peers with stored secrets
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Load a store, an absent file yields an empty one
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No secrets at {}", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Write the store readable by the owner only
    ///
    /// An empty store removes a stale file instead of writing one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if self.is_empty() {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml::to_string_pretty(self)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}
