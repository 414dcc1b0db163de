//! Tunnel Peers
//!
//! A peer is one remote endpoint of the tunnel, identified by its public
//! key. [`PeerMap`] keeps peers in insertion order keyed by that public key.

use std::collections::HashMap;

use tracing::debug;

use crate::codec;
use crate::error::{Result, WgError};
use crate::keys::{KeyFactory, KeyPair};
use crate::secrets::PeerSecrets;

/// Allowed IPs used when a peer does not specify any (route everything)
pub const DEFAULT_ALLOWED_IPS: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// Construction input for a [`Peer`]
///
/// Every field is optional. When a private key is given the public key is
/// derived from it. A lone public key describes a remote peer whose private
/// key is unknown; with neither, a fresh pair is generated. The parser never
/// hands over a keyless record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerParams {
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub preshared_key: Option<String>,
    pub allowed_ips: Vec<String>,
    pub persistent_keepalive: Option<u32>,
    pub endpoint: Option<String>,
}

impl PeerParams {
    /// Creates empty peer parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set private key
    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Builder pattern: set public key
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    /// Builder pattern: set preshared key
    pub fn with_preshared_key(mut self, key: impl Into<String>) -> Self {
        self.preshared_key = Some(key.into());
        self
    }

    /// Builder pattern: add an allowed IP range
    pub fn with_allowed_ip(mut self, cidr: impl Into<String>) -> Self {
        self.allowed_ips.push(cidr.into());
        self
    }

    /// Builder pattern: set keepalive interval in seconds
    pub fn with_keepalive(mut self, seconds: u32) -> Self {
        self.persistent_keepalive = Some(seconds);
        self
    }

    /// Builder pattern: set endpoint (`host:port`)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn key_pair(&self, keys: &KeyFactory) -> Result<KeyPair> {
        let private_key = non_empty(self.private_key.as_deref());
        let public_key = non_empty(self.public_key.as_deref());

        let pair = match (private_key, public_key) {
            (Some(private_key), expected) => {
                let pair = KeyPair::from_private_key(private_key, keys)?;
                if let Some(expected) = expected {
                    if expected != pair.public_key() {
                        return Err(WgError::KeyMismatch {
                            expected: expected.to_string(),
                            derived: pair.public_key().to_string(),
                        });
                    }
                }
                pair
            }
            (None, Some(public_key)) => KeyPair::from_public_key(public_key),
            (None, None) => KeyPair::generate(keys)?,
        };

        Ok(match non_empty(self.preshared_key.as_deref()) {
            Some(psk) => pair.with_preshared_key(Some(psk.to_string())),
            None => pair,
        })
    }
}

/// One remote endpoint of the tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    key_pair: KeyPair,
    allowed_ips: Vec<String>,
    persistent_keepalive: Option<u32>,
    endpoint: Option<String>,
}

impl Peer {
    /// Create a peer around an existing key pair
    ///
    /// Empty `allowed_ips` fall back to [`DEFAULT_ALLOWED_IPS`]; a zero
    /// keepalive means none.
    pub fn new(
        key_pair: KeyPair,
        allowed_ips: Vec<String>,
        persistent_keepalive: Option<u32>,
        endpoint: Option<String>,
    ) -> Self {
        let allowed_ips: Vec<String> = allowed_ips
            .iter()
            .flat_map(|entry| codec::split_list(entry))
            .collect();

        let allowed_ips = if allowed_ips.is_empty() {
            DEFAULT_ALLOWED_IPS.iter().map(|s| s.to_string()).collect()
        } else {
            allowed_ips
        };

        Self {
            key_pair,
            allowed_ips,
            persistent_keepalive: persistent_keepalive.filter(|&secs| secs > 0),
            endpoint: endpoint
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        }
    }

    /// Create a peer from construction parameters
    pub fn from_params(params: PeerParams, keys: &KeyFactory) -> Result<Self> {
        let key_pair = params.key_pair(keys)?;
        Ok(Self::new(
            key_pair,
            params.allowed_ips,
            params.persistent_keepalive,
            params.endpoint,
        ))
    }

    /// Replace the key pair with a freshly generated one
    ///
    /// Allowed IPs and endpoint are untouched. A peer stored in a
    /// [`crate::TunnelConfig`] must be rotated through
    /// [`crate::TunnelConfig::rotate_peer_keys`] so its entry is re-keyed.
    pub fn revoke_keys(&mut self, keys: &KeyFactory) -> Result<()> {
        self.key_pair = self.key_pair.revoke(keys)?;
        Ok(())
    }

    /// Restore secrets kept outside the config text
    ///
    /// A stored private key must derive this peer's public key.
    pub fn attach_secrets(&mut self, secrets: &PeerSecrets, keys: &KeyFactory) -> Result<()> {
        let pair = match non_empty(secrets.private_key.as_deref()) {
            Some(private_key) => {
                let pair = KeyPair::from_private_key(private_key, keys)?;
                if pair.public_key() != self.public_key() {
                    return Err(WgError::KeyMismatch {
                        expected: self.public_key().to_string(),
                        derived: pair.public_key().to_string(),
                    });
                }
                pair
            }
            None => self.key_pair.clone(),
        };

        let preshared_key = non_empty(secrets.preshared_key.as_deref())
            .or(self.key_pair.preshared_key())
            .map(String::from);
        self.key_pair = pair.with_preshared_key(preshared_key);
        Ok(())
    }

    /// Secret key material held for this peer
    pub fn secrets(&self) -> PeerSecrets {
        PeerSecrets {
            private_key: self.key_pair.private_key().map(String::from),
            preshared_key: self.key_pair.preshared_key().map(String::from),
        }
    }

    /// Render the peer block
    pub fn render(&self) -> String {
        codec::render_peer(self)
    }

    /// Get the key pair
    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Get the public key
    pub fn public_key(&self) -> &str {
        self.key_pair.public_key()
    }

    /// Get the allowed IP ranges
    pub fn allowed_ips(&self) -> &[String] {
        &self.allowed_ips
    }

    /// Get the keepalive interval in seconds
    pub fn persistent_keepalive(&self) -> Option<u32> {
        self.persistent_keepalive
    }

    /// Get the endpoint
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

/// Insertion-ordered peers keyed by public key
///
/// Keys always equal the public key of the stored peer. Mutation goes
/// through [`PeerMap::insert`], [`PeerMap::remove`] and
/// [`PeerMap::rotate`] so the index can never drift from the peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerMap {
    peers: Vec<Peer>,
    index: HashMap<String, usize>,
}

impl PeerMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer under its public key
    pub fn insert(&mut self, peer: Peer) -> Result<&Peer> {
        let key = peer.public_key().to_string();
        if self.index.contains_key(&key) {
            return Err(WgError::DuplicatePeer(key));
        }

        let position = self.peers.len();
        self.index.insert(key, position);
        self.peers.push(peer);
        debug_assert!(self.check_invariants());
        Ok(&self.peers[position])
    }

    /// Remove the peer with `public_key`
    pub fn remove(&mut self, public_key: &str) -> Result<Peer> {
        let position = self
            .index
            .remove(public_key)
            .ok_or_else(|| WgError::PeerNotFound(public_key.to_string()))?;

        let peer = self.peers.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        debug_assert!(self.check_invariants());
        Ok(peer)
    }

    /// Revoke the keys of the peer with `public_key` and re-key its entry
    ///
    /// The peer keeps its position. Returns the rotated peer.
    pub fn rotate(&mut self, public_key: &str, keys: &KeyFactory) -> Result<&Peer> {
        let position = *self
            .index
            .get(public_key)
            .ok_or_else(|| WgError::PeerNotFound(public_key.to_string()))?;

        let mut rotated = self.peers[position].clone();
        rotated.revoke_keys(keys)?;

        let new_key = rotated.public_key().to_string();
        if self.index.contains_key(&new_key) {
            return Err(WgError::DuplicatePeer(new_key));
        }

        debug!("Re-keyed peer {} -> {}", public_key, new_key);
        self.index.remove(public_key);
        self.index.insert(new_key, position);
        self.peers[position] = rotated;

        debug_assert!(self.check_invariants());
        Ok(&self.peers[position])
    }

    /// Restore stored secrets onto the peer with `public_key`
    ///
    /// The public key cannot change here, so the index stays valid.
    pub fn attach_secrets(
        &mut self,
        public_key: &str,
        secrets: &PeerSecrets,
        keys: &KeyFactory,
    ) -> Result<()> {
        let position = *self
            .index
            .get(public_key)
            .ok_or_else(|| WgError::PeerNotFound(public_key.to_string()))?;

        self.peers[position].attach_secrets(secrets, keys)?;
        debug_assert!(self.check_invariants());
        Ok(())
    }

    /// Look up a peer by public key
    pub fn get(&self, public_key: &str) -> Option<&Peer> {
        self.index.get(public_key).map(|&i| &self.peers[i])
    }

    /// Check whether a peer is registered
    pub fn contains(&self, public_key: &str) -> bool {
        self.index.contains_key(public_key)
    }

    /// Iterate peers in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Peer> {
        self.peers.iter()
    }

    /// Number of peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if there are any peers
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Verify every key maps to the peer carrying that public key
    pub fn check_invariants(&self) -> bool {
        self.index.len() == self.peers.len()
            && self
                .index
                .iter()
                .all(|(key, &i)| self.peers.get(i).is_some_and(|p| p.public_key() == key))
    }
}

impl<'a> IntoIterator for &'a PeerMap {
    type Item = &'a Peer;
    type IntoIter = std::slice::Iter<'a, Peer>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated_peer(keys: &KeyFactory, cidr: &str) -> Peer {
        Peer::from_params(PeerParams::new().with_allowed_ip(cidr), keys).unwrap()
    }

    #[test]
    fn test_default_allowed_ips() {
        let keys = KeyFactory::default();
        let peer = Peer::from_params(PeerParams::new(), &keys).unwrap();
        assert_eq!(peer.allowed_ips(), ["0.0.0.0/0", "::/0"]);
        assert!(peer.key_pair().private_key().is_some());
    }

    #[test]
    fn test_zero_keepalive_is_none() {
        let keys = KeyFactory::default();
        let peer = Peer::from_params(PeerParams::new().with_keepalive(0), &keys).unwrap();
        assert_eq!(peer.persistent_keepalive(), None);
    }

    #[test]
    fn test_comma_joined_allowed_ips_are_split() {
        let keys = KeyFactory::default();
        let peer = generated_peer(&keys, "10.0.0.2/32, 10.0.1.0/24");
        assert_eq!(peer.allowed_ips(), ["10.0.0.2/32", "10.0.1.0/24"]);
    }

    #[test]
    fn test_public_key_only_peer() {
        let keys = KeyFactory::default();
        let peer =
            Peer::from_params(PeerParams::new().with_public_key("remote-key="), &keys).unwrap();
        assert_eq!(peer.public_key(), "remote-key=");
        assert!(peer.key_pair().private_key().is_none());
    }

    #[test]
    fn test_mismatched_public_key_rejected() {
        let keys = KeyFactory::default();
        let pair = KeyPair::generate(&keys).unwrap();
        let params = PeerParams::new()
            .with_private_key(pair.private_key().unwrap())
            .with_public_key("somebody-else=");

        assert!(matches!(
            Peer::from_params(params, &keys),
            Err(WgError::KeyMismatch { .. })
        ));
    }

    #[test]
    fn test_revoke_keys_keeps_routing() {
        let keys = KeyFactory::default();
        let mut peer = Peer::from_params(
            PeerParams::new()
                .with_allowed_ip("10.0.0.5/32")
                .with_endpoint("vpn.example.com:51820"),
            &keys,
        )
        .unwrap();
        let old_key = peer.public_key().to_string();

        peer.revoke_keys(&keys).unwrap();

        assert_ne!(peer.public_key(), old_key);
        assert_eq!(peer.allowed_ips(), ["10.0.0.5/32"]);
        assert_eq!(peer.endpoint(), Some("vpn.example.com:51820"));
    }

    #[test]
    fn test_map_insert_and_duplicate() {
        let keys = KeyFactory::default();
        let peer = generated_peer(&keys, "10.0.0.2/32");
        let mut map = PeerMap::new();

        map.insert(peer.clone()).unwrap();
        assert!(matches!(map.insert(peer), Err(WgError::DuplicatePeer(_))));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_map_remove_keeps_index_consistent() {
        let keys = KeyFactory::default();
        let peers: Vec<Peer> = (2..6)
            .map(|i| generated_peer(&keys, &format!("10.0.0.{}/32", i)))
            .collect();

        let mut map = PeerMap::new();
        for peer in &peers {
            map.insert(peer.clone()).unwrap();
        }

        let removed = map.remove(peers[1].public_key()).unwrap();
        assert_eq!(removed, peers[1]);
        assert!(map.check_invariants());
        assert_eq!(map.get(peers[3].public_key()), Some(&peers[3]));
        assert!(matches!(
            map.remove(peers[1].public_key()),
            Err(WgError::PeerNotFound(_))
        ));
    }

    #[test]
    fn test_map_rotate_rekeys_in_place() {
        let keys = KeyFactory::default();
        let first = generated_peer(&keys, "10.0.0.2/32");
        let second = generated_peer(&keys, "10.0.0.3/32");
        let mut map = PeerMap::new();
        map.insert(first.clone()).unwrap();
        map.insert(second.clone()).unwrap();

        let new_key = map
            .rotate(first.public_key(), &keys)
            .unwrap()
            .public_key()
            .to_string();

        assert!(!map.contains(first.public_key()));
        assert!(map.contains(&new_key));
        assert!(map.check_invariants());

        let order: Vec<&str> = map.iter().map(|p| p.public_key()).collect();
        assert_eq!(order, vec![new_key.as_str(), second.public_key()]);
        assert_eq!(map.get(&new_key).unwrap().allowed_ips(), ["10.0.0.2/32"]);
    }

    #[test]
    fn test_attach_secrets_restores_private_key() {
        let keys = KeyFactory::default();
        let original = generated_peer(&keys, "10.0.0.2/32");
        let mut remote = Peer::from_params(
            PeerParams::new()
                .with_public_key(original.public_key())
                .with_allowed_ip("10.0.0.2/32"),
            &keys,
        )
        .unwrap();

        remote.attach_secrets(&original.secrets(), &keys).unwrap();
        assert_eq!(remote, original);
    }

    #[test]
    fn test_attach_foreign_secrets_rejected() {
        let keys = KeyFactory::default();
        let stranger = generated_peer(&keys, "10.0.0.3/32");
        let mut map = PeerMap::new();
        let key = map
            .insert(Peer::from_params(PeerParams::new().with_public_key("remote="), &keys).unwrap())
            .unwrap()
            .public_key()
            .to_string();

        assert!(matches!(
            map.attach_secrets(&key, &stranger.secrets(), &keys),
            Err(WgError::KeyMismatch { .. })
        ));
        assert!(map.get(&key).unwrap().key_pair().private_key().is_none());
        assert!(matches!(
            map.attach_secrets("absent=", &stranger.secrets(), &keys),
            Err(WgError::PeerNotFound(_))
        ));
    }
}
