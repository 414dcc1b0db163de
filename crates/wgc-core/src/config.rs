//! Configuration management for WgConf
//!
//! Handles loading and saving of tool settings: where the tunnel file
//! lives, how public keys are derived and defaults for new peers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::brand::{CONFIG_DIR_NAME, DEFAULT_INTERFACE};
use crate::error::Result;
use crate::keys::{KeyFactory, WgToolDerivation, X25519Derivation};

/// How public keys are derived from private keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyBackend {
    /// Built-in Curve25519
    #[default]
    X25519,
    /// Shell out to `wg pubkey`
    WgTool,
}

impl KeyBackend {
    /// Key collaborators for this backend
    pub fn key_factory(self) -> KeyFactory {
        match self {
            KeyBackend::X25519 => {
                KeyFactory::default().with_derivation(Arc::new(X25519Derivation))
            }
            KeyBackend::WgTool => {
                KeyFactory::default().with_derivation(Arc::new(WgToolDerivation::new()))
            }
        }
    }
}

/// Main settings for WgConf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WgConfSettings {
    /// Path to the tunnel configuration file
    pub tunnel_path: PathBuf,

    /// Public key derivation backend
    pub key_backend: KeyBackend,

    /// Server endpoint written into exported client configs
    pub default_endpoint: Option<String>,

    /// Keepalive applied to new peers
    pub default_keepalive: Option<u32>,

    /// DNS server for newly initialised tunnels
    pub default_dns: Option<String>,

    /// MTU for newly initialised tunnels
    pub default_mtu: Option<u32>,
}

impl Default for WgConfSettings {
    fn default() -> Self {
        Self {
            tunnel_path: Self::default_tunnel_path(),
            key_backend: KeyBackend::default(),
            default_endpoint: None,
            default_keepalive: None,
            default_dns: None,
            default_mtu: None,
        }
    }
}

impl WgConfSettings {
    /// Creates settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }

    /// Loads settings from a file, falling back to defaults when it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Saves settings to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Returns the default configuration directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    /// Returns the default settings file path
    pub fn default_settings_path() -> PathBuf {
        Self::default_config_dir().join("settings.toml")
    }

    /// Returns the default tunnel file path
    pub fn default_tunnel_path() -> PathBuf {
        Self::default_config_dir().join(format!("{}.conf", DEFAULT_INTERFACE))
    }

    /// Key collaborators for the configured backend
    pub fn key_factory(&self) -> KeyFactory {
        self.key_backend.key_factory()
    }

    /// Builder pattern: set tunnel file path
    pub fn with_tunnel_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tunnel_path = path.into();
        self
    }

    /// Builder pattern: set key backend
    pub fn with_key_backend(mut self, backend: KeyBackend) -> Self {
        self.key_backend = backend;
        self
    }

    /// Builder pattern: set default endpoint
    pub fn with_default_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.default_endpoint = Some(endpoint.into());
        self
    }

    /// Builder pattern: set default keepalive
    pub fn with_default_keepalive(mut self, seconds: u32) -> Self {
        self.default_keepalive = Some(seconds);
        self
    }

    /// Builder pattern: set default DNS
    pub fn with_default_dns(mut self, dns: impl Into<String>) -> Self {
        self.default_dns = Some(dns.into());
        self
    }

    /// Builder pattern: set default MTU
    pub fn with_default_mtu(mut self, mtu: u32) -> Self {
        self.default_mtu = Some(mtu);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WgError;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = WgConfSettings::default();
        assert_eq!(settings.key_backend, KeyBackend::X25519);
        assert!(settings.tunnel_path.ends_with("wgconf/wg0.conf"));
        assert!(settings.default_endpoint.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let settings = WgConfSettings::new()
            .with_tunnel_path("/etc/wireguard/wg1.conf")
            .with_default_endpoint("vpn.example.com:51820")
            .with_default_keepalive(25)
            .with_key_backend(KeyBackend::WgTool);

        assert_eq!(settings.tunnel_path, PathBuf::from("/etc/wireguard/wg1.conf"));
        assert_eq!(settings.default_endpoint.as_deref(), Some("vpn.example.com:51820"));
        assert_eq!(settings.default_keepalive, Some(25));
        assert_eq!(settings.key_backend, KeyBackend::WgTool);
    }

    #[test]
    fn test_save_and_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("settings.toml");

        let settings = WgConfSettings::new()
            .with_tunnel_path(temp.path().join("wg0.conf"))
            .with_default_dns("1.1.1.1")
            .with_default_mtu(1420);
        settings.save(&path).unwrap();

        let loaded = WgConfSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.toml");
        std::fs::write(&path, "key_backend = \"wg-tool\"\ndefault_keepalive = 15\n").unwrap();

        let loaded = WgConfSettings::load(&path).unwrap();
        assert_eq!(loaded.key_backend, KeyBackend::WgTool);
        assert_eq!(loaded.default_keepalive, Some(15));
        assert_eq!(loaded.tunnel_path, WgConfSettings::default_tunnel_path());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let temp = tempdir().unwrap();
        let loaded = WgConfSettings::load_or_default(temp.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, WgConfSettings::default());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("settings.toml");
        std::fs::write(&path, "key_backend = \"quantum\"\n").unwrap();

        assert!(matches!(WgConfSettings::load(&path), Err(WgError::ConfigError(_))));
    }
}
