//! Shared tunnel handle
//!
//! Serialises every mutation of one [`TunnelConfig`] so concurrent callers
//! never receive the same free address.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::peer::{Peer, PeerParams};
use crate::tunnel::{ClientOverrides, TunnelConfig};

/// Cloneable handle around a single tunnel config
#[derive(Debug, Clone)]
pub struct SharedTunnel {
    inner: Arc<Mutex<TunnelConfig>>,
}

impl SharedTunnel {
    /// Take ownership of `config`
    pub fn new(config: TunnelConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(config)),
        }
    }

    /// Allocate and register a peer
    ///
    /// Address selection and insertion happen under one lock.
    pub fn add_peer(&self, params: PeerParams) -> Result<Peer> {
        self.inner.lock().add_peer(params).cloned()
    }

    /// Remove a peer
    pub fn remove_peer(&self, public_key: &str) -> Result<Peer> {
        self.inner.lock().remove_peer(public_key)
    }

    /// Rotate a peer's keys, re-keying its entry
    pub fn rotate_peer_keys(&self, public_key: &str) -> Result<Peer> {
        self.inner.lock().rotate_peer_keys(public_key).cloned()
    }

    /// Render the canonical text
    pub fn render(&self) -> String {
        self.inner.lock().render()
    }

    /// Render a client config for one peer
    pub fn render_peer_client_config(
        &self,
        public_key: &str,
        overrides: &ClientOverrides,
    ) -> Result<String> {
        self.inner.lock().render_peer_client_config(public_key, overrides)
    }

    /// Fingerprint of the canonical text
    pub fn fingerprint(&self) -> String {
        self.inner.lock().fingerprint()
    }

    /// Run `f` with exclusive access to the config
    pub fn with<R>(&self, f: impl FnOnce(&mut TunnelConfig) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Clone the current state
    pub fn snapshot(&self) -> TunnelConfig {
        self.inner.lock().clone()
    }
}
