//! Tunnel Configuration
//!
//! The aggregate tying the local interface to its peers. Owns peer
//! registration, address allocation and both text directions.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::{self, bare_address, parse_block};
use crate::codec::{self, split_list, ClientDocument};
use crate::error::{Result, WgError};
use crate::fingerprint;
use crate::keys::{KeyFactory, KeyPair};
use crate::peer::{Peer, PeerMap, PeerParams};
use crate::secrets::SecretStore;

/// Listen port used when a parsed config does not name one
pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// Construction input for a [`TunnelConfig`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelParams {
    pub addresses: Vec<String>,
    pub listen_port: u16,
    pub private_key: String,
    /// Expected public key, checked against the derived one when present
    pub public_key: Option<String>,
    pub dns: Option<String>,
    pub mtu: Option<u32>,
    pub pre_up: Vec<String>,
    pub post_up: Vec<String>,
    pub pre_down: Vec<String>,
    pub post_down: Vec<String>,
    pub peers: Vec<PeerParams>,
}

impl TunnelParams {
    /// Parameters for a single address (which may itself be comma-joined)
    pub fn new(
        address: impl Into<String>,
        listen_port: u16,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            addresses: vec![address.into()],
            listen_port,
            private_key: private_key.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: add another interface address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    /// Builder pattern: set DNS server
    pub fn with_dns(mut self, dns: impl Into<String>) -> Self {
        self.dns = Some(dns.into());
        self
    }

    /// Builder pattern: set MTU
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Builder pattern: add a PreUp command
    pub fn with_pre_up(mut self, command: impl Into<String>) -> Self {
        self.pre_up.push(command.into());
        self
    }

    /// Builder pattern: add a PostUp command
    pub fn with_post_up(mut self, command: impl Into<String>) -> Self {
        self.post_up.push(command.into());
        self
    }

    /// Builder pattern: add a PreDown command
    pub fn with_pre_down(mut self, command: impl Into<String>) -> Self {
        self.pre_down.push(command.into());
        self
    }

    /// Builder pattern: add a PostDown command
    pub fn with_post_down(mut self, command: impl Into<String>) -> Self {
        self.post_down.push(command.into());
        self
    }

    /// Builder pattern: add an initial peer
    pub fn with_peer(mut self, peer: PeerParams) -> Self {
        self.peers.push(peer);
        self
    }
}

/// Overrides applied when exporting a client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOverrides {
    pub endpoint: Option<String>,
    pub allowed_ips: Vec<String>,
    pub persistent_keepalive: Option<u32>,
}

impl ClientOverrides {
    /// Creates empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set server endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builder pattern: add a route for the client
    pub fn with_allowed_ip(mut self, cidr: impl Into<String>) -> Self {
        self.allowed_ips.push(cidr.into());
        self
    }

    /// Builder pattern: set keepalive
    pub fn with_keepalive(mut self, seconds: u32) -> Self {
        self.persistent_keepalive = Some(seconds);
        self
    }
}

/// Local interface plus its peers
#[derive(Debug, Clone)]
pub struct TunnelConfig {
    addresses: Vec<String>,
    listen_port: u16,
    key_pair: KeyPair,
    dns: Option<String>,
    mtu: Option<u32>,
    pre_up: Vec<String>,
    post_up: Vec<String>,
    pre_down: Vec<String>,
    post_down: Vec<String>,
    peers: PeerMap,
    keys: KeyFactory,
}

impl TunnelConfig {
    /// Build a config using the default key collaborators
    pub fn new(params: TunnelParams) -> Result<Self> {
        Self::with_keys(params, KeyFactory::default())
    }

    /// Build a config with explicit key collaborators
    pub fn with_keys(params: TunnelParams, keys: KeyFactory) -> Result<Self> {
        let key_pair = KeyPair::from_private_key(params.private_key, &keys)?;
        if let Some(expected) = params.public_key.as_deref().map(str::trim) {
            if !expected.is_empty() && expected != key_pair.public_key() {
                return Err(WgError::KeyMismatch {
                    expected: expected.to_string(),
                    derived: key_pair.public_key().to_string(),
                });
            }
        }

        let mut peers = PeerMap::new();
        for peer in params.peers {
            peers.insert(Peer::from_params(peer, &keys)?)?;
        }

        Ok(Self {
            addresses: params.addresses.iter().flat_map(|a| split_list(a)).collect(),
            listen_port: params.listen_port,
            key_pair,
            dns: params.dns.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            mtu: params.mtu.filter(|&mtu| mtu > 0),
            pre_up: commands(params.pre_up),
            post_up: commands(params.post_up),
            pre_down: commands(params.pre_down),
            post_down: commands(params.post_down),
            peers,
            keys,
        })
    }

    /// Parse configuration text using the default key collaborators
    pub fn parse(text: &str) -> Result<Self> {
        codec::parse(text, KeyFactory::default())
    }

    /// Parse configuration text with explicit key collaborators
    pub fn parse_with_keys(text: &str, keys: KeyFactory) -> Result<Self> {
        codec::parse(text, keys)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_keys(path, KeyFactory::default())
    }

    /// Load a config file with explicit key collaborators
    ///
    /// Peer secrets from the sidecar next to `path` are restored.
    pub fn load_with_keys(path: impl AsRef<Path>, keys: KeyFactory) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = codec::parse(&text, keys)?;
        config.apply_secrets(&SecretStore::load(SecretStore::path_for(path))?)?;
        Ok(config)
    }

    /// Write the canonical text to `path` and peer secrets beside it
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.render())?;

        // Contains private keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        self.peer_secrets().save(SecretStore::path_for(path))
    }

    /// Secrets of every peer that holds any
    pub fn peer_secrets(&self) -> SecretStore {
        let mut store = SecretStore::new();
        for peer in &self.peers {
            store.insert(peer.public_key(), peer.secrets());
        }
        store
    }

    /// Restore peer secrets kept outside the config text
    ///
    /// Entries for peers that are no longer configured are skipped.
    pub fn apply_secrets(&mut self, store: &SecretStore) -> Result<()> {
        for (public_key, secrets) in store.iter() {
            if self.peers.contains(public_key) {
                self.peers.attach_secrets(public_key, secrets, &self.keys)?;
            } else {
                debug!("Skipping secrets of unknown peer {}", public_key);
            }
        }
        Ok(())
    }

    /// Register a new peer, allocating an address when none is given
    ///
    /// Without caller-supplied allowed IPs the peer gets the next free
    /// single-host `/32`. Supplied allowed IPs must be well formed, must not
    /// reuse an address already in use and, inside the interface pools,
    /// must not overlap a block already assigned.
    pub fn add_peer(&mut self, mut params: PeerParams) -> Result<&Peer> {
        params.allowed_ips = params.allowed_ips.iter().flat_map(|a| split_list(a)).collect();

        if params.allowed_ips.is_empty() {
            let free = address::next_free(&self.addresses, &self.taken_addresses())?;
            params.allowed_ips = vec![format!("{}/32", free)];
        } else {
            self.check_conflicts(&params.allowed_ips)?;
        }

        let peer = Peer::from_params(params, &self.keys)?;
        info!("Adding peer {} ({})", peer.public_key(), peer.allowed_ips().join(","));
        self.peers.insert(peer)
    }

    /// Remove the peer with `public_key`
    pub fn remove_peer(&mut self, public_key: &str) -> Result<Peer> {
        let peer = self.peers.remove(public_key)?;
        info!("Removed peer {}", public_key);
        Ok(peer)
    }

    /// Replace the keys of a peer and re-register it under the new public key
    pub fn rotate_peer_keys(&mut self, public_key: &str) -> Result<&Peer> {
        let peer = self.peers.rotate(public_key, &self.keys)?;
        info!("Rotated keys of peer {} -> {}", public_key, peer.public_key());
        Ok(peer)
    }

    /// Bare addresses currently assigned to peers
    pub fn used_addresses(&self) -> HashSet<String> {
        self.peers
            .iter()
            .flat_map(|peer| peer.allowed_ips())
            .map(|entry| bare_address(entry).to_string())
            .collect()
    }

    /// The address `add_peer` would hand out next
    pub fn next_free_address(&self) -> Result<Ipv4Addr> {
        address::next_free(&self.addresses, &self.taken_addresses())
    }

    /// Render the canonical configuration text
    pub fn render(&self) -> String {
        codec::render(self)
    }

    /// Render a client-side configuration for one peer
    ///
    /// The endpoint comes from `overrides` first, then from the stored peer.
    pub fn render_peer_client_config(
        &self,
        public_key: &str,
        overrides: &ClientOverrides,
    ) -> Result<String> {
        let peer = self
            .peers
            .get(public_key)
            .ok_or_else(|| WgError::PeerNotFound(public_key.to_string()))?;

        let endpoint = overrides
            .endpoint
            .as_deref()
            .or(peer.endpoint())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| WgError::EndpointRequired(public_key.to_string()))?;

        let private_key = peer
            .key_pair()
            .private_key()
            .ok_or_else(|| WgError::PrivateKeyUnavailable(public_key.to_string()))?;

        let allowed_ips = if overrides.allowed_ips.is_empty() {
            peer.allowed_ips().to_vec()
        } else {
            overrides.allowed_ips.iter().flat_map(|a| split_list(a)).collect()
        };

        debug!("Exporting client config for {} via {}", public_key, endpoint);

        Ok(codec::render_client(&ClientDocument {
            private_key,
            addresses: peer.allowed_ips(),
            dns: self.dns(),
            server_public_key: self.public_key(),
            allowed_ips: &allowed_ips,
            persistent_keepalive: overrides
                .persistent_keepalive
                .or(peer.persistent_keepalive())
                .filter(|&secs| secs > 0),
            endpoint,
        }))
    }

    /// Stable digest of the canonical text
    pub fn fingerprint(&self) -> String {
        fingerprint::digest(&self.render())
    }

    /// Serializable overview without private key material
    pub fn summary(&self) -> TunnelSummary {
        TunnelSummary {
            public_key: self.public_key().to_string(),
            addresses: self.addresses.clone(),
            listen_port: self.listen_port,
            dns: self.dns.clone(),
            mtu: self.mtu,
            fingerprint: self.fingerprint(),
            peers: self
                .peers
                .iter()
                .map(|peer| PeerSummary {
                    public_key: peer.public_key().to_string(),
                    allowed_ips: peer.allowed_ips().to_vec(),
                    persistent_keepalive: peer.persistent_keepalive(),
                    endpoint: peer.endpoint().map(String::from),
                    has_private_key: peer.key_pair().private_key().is_some(),
                    has_preshared_key: peer.key_pair().preshared_key().is_some(),
                })
                .collect(),
        }
    }

    /// Pretty JSON of [`TunnelConfig::summary`]
    pub fn summary_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }

    /// Get the interface addresses
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Get the listen port
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Get the local key pair
    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Get the local private key
    pub fn private_key(&self) -> &str {
        self.key_pair.private_key().unwrap_or_default()
    }

    /// Get the local public key
    pub fn public_key(&self) -> &str {
        self.key_pair.public_key()
    }

    /// Get the DNS server
    pub fn dns(&self) -> Option<&str> {
        self.dns.as_deref()
    }

    /// Get the MTU
    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    pub fn pre_up(&self) -> &[String] {
        &self.pre_up
    }

    pub fn post_up(&self) -> &[String] {
        &self.post_up
    }

    pub fn pre_down(&self) -> &[String] {
        &self.pre_down
    }

    pub fn post_down(&self) -> &[String] {
        &self.post_down
    }

    /// Get the peers
    pub fn peers(&self) -> &PeerMap {
        &self.peers
    }

    /// Look up a peer by public key
    pub fn peer(&self, public_key: &str) -> Option<&Peer> {
        self.peers.get(public_key)
    }

    /// Get the key collaborators
    pub fn key_factory(&self) -> &KeyFactory {
        &self.keys
    }

    // Peer addresses plus the interface's own host addresses
    fn taken_addresses(&self) -> HashSet<String> {
        let mut taken = self.used_addresses();
        taken.extend(self.addresses.iter().map(|a| bare_address(a).to_string()));
        taken
    }

    // Blocks outside every pool (routed ranges such as 0.0.0.0/0) are only
    // checked by bare address
    fn check_conflicts(&self, entries: &[String]) -> Result<()> {
        let pools: Vec<IpNet> = self
            .addresses
            .iter()
            .filter_map(|a| parse_block(a).ok())
            .collect();
        let in_pool = |net: &IpNet| pools.iter().any(|pool| pool.contains(net));

        let interface_hosts = pools
            .iter()
            .filter_map(|pool| IpNet::new(pool.addr(), pool.max_prefix_len()).ok());
        let assigned: Vec<IpNet> = self
            .peers
            .iter()
            .flat_map(|peer| peer.allowed_ips())
            .filter_map(|entry| parse_block(entry).ok())
            .chain(interface_hosts)
            .filter(|net| in_pool(net))
            .collect();

        let taken = self.taken_addresses();
        for entry in entries {
            let net = parse_block(entry)?;
            let overlaps = in_pool(&net)
                && assigned.iter().any(|other| net.contains(other) || other.contains(&net));

            if overlaps || taken.contains(bare_address(entry)) {
                return Err(WgError::AddressConflict(entry.clone()));
            }
        }
        Ok(())
    }
}

impl PartialEq for TunnelConfig {
    fn eq(&self, other: &Self) -> bool {
        self.addresses == other.addresses
            && self.listen_port == other.listen_port
            && self.key_pair == other.key_pair
            && self.dns == other.dns
            && self.mtu == other.mtu
            && self.pre_up == other.pre_up
            && self.post_up == other.post_up
            && self.pre_down == other.pre_down
            && self.post_down == other.post_down
            && self.peers == other.peers
    }
}

impl Eq for TunnelConfig {}

impl std::fmt::Display for TunnelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Serializable tunnel overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelSummary {
    pub public_key: String,
    pub addresses: Vec<String>,
    pub listen_port: u16,
    pub dns: Option<String>,
    pub mtu: Option<u32>,
    pub fingerprint: String,
    pub peers: Vec<PeerSummary>,
}

/// Serializable peer overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSummary {
    pub public_key: String,
    pub allowed_ips: Vec<String>,
    pub persistent_keepalive: Option<u32>,
    pub endpoint: Option<String>,
    pub has_private_key: bool,
    pub has_preshared_key: bool,
}

fn commands(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}
