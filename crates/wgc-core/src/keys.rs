//! Tunnel Key Material
//!
//! Key pairs for tunnel endpoints plus the two collaborators they rely on:
//! public key derivation and a randomness source. Keys travel as standard
//! base64 text of 32 bytes.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{Result, WgError};

/// Length of raw key material in bytes
pub const KEY_SIZE: usize = 32;

/// Derives a public key from a private key
pub trait KeyDerivation: Send + Sync {
    /// Derive the base64 public key for a base64 private key
    fn derive_public_key(&self, private_key: &str) -> Result<String>;
}

/// Source of random bytes for new key material
pub trait RandomSource: Send + Sync {
    /// Fill `buf` with random bytes
    fn fill(&self, buf: &mut [u8]) -> Result<()>;
}

/// Pure Curve25519 derivation, no external tooling
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519Derivation;

impl KeyDerivation for X25519Derivation {
    fn derive_public_key(&self, private_key: &str) -> Result<String> {
        let bytes = decode_key(private_key)?;
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Ok(BASE64.encode(public.as_bytes()))
    }
}

/// Derivation through the `wg pubkey` command line tool
#[derive(Debug, Clone)]
pub struct WgToolDerivation {
    program: String,
}

impl WgToolDerivation {
    /// Use `wg` from `PATH`
    pub fn new() -> Self {
        Self::with_program("wg")
    }

    /// Use a specific `wg` binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for WgToolDerivation {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDerivation for WgToolDerivation {
    fn derive_public_key(&self, private_key: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg("pubkey")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WgError::KeyDerivationFailed(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            writeln!(stdin, "{}", private_key.trim())
                .map_err(|e| WgError::KeyDerivationFailed(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| WgError::KeyDerivationFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(WgError::KeyDerivationFailed(format!(
                "{} pubkey exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let public_key = String::from_utf8_lossy(&output.stdout).trim().to_string();
        decode_key(&public_key).map_err(|_| {
            WgError::KeyDerivationFailed(format!("unexpected output {:?}", public_key))
        })?;

        Ok(public_key)
    }
}

/// Operating system randomness
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| WgError::KeyDerivationFailed(format!("randomness unavailable: {}", e)))
    }
}

/// Bundles the derivation and randomness collaborators
#[derive(Clone)]
pub struct KeyFactory {
    derivation: Arc<dyn KeyDerivation>,
    random: Arc<dyn RandomSource>,
}

impl KeyFactory {
    /// Create a factory from explicit collaborators
    pub fn new(derivation: Arc<dyn KeyDerivation>, random: Arc<dyn RandomSource>) -> Self {
        Self { derivation, random }
    }

    /// Swap the derivation, keeping the randomness source
    pub fn with_derivation(mut self, derivation: Arc<dyn KeyDerivation>) -> Self {
        self.derivation = derivation;
        self
    }

    /// Derive the public key for `private_key`
    pub fn derive_public_key(&self, private_key: &str) -> Result<String> {
        self.derivation.derive_public_key(private_key)
    }

    /// Draw a fresh base64-encoded secret
    pub fn random_key(&self) -> Result<String> {
        let mut bytes = [0u8; KEY_SIZE];
        self.random.fill(&mut bytes)?;
        Ok(BASE64.encode(bytes))
    }
}

impl Default for KeyFactory {
    fn default() -> Self {
        Self::new(Arc::new(X25519Derivation), Arc::new(OsRandom))
    }
}

impl std::fmt::Debug for KeyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFactory").finish_non_exhaustive()
    }
}

/// Key material identifying one tunnel endpoint
///
/// The public key is always derived from the private key when one is held.
/// Remote peers read from a server config are known by public key only.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    private_key: Option<String>,
    public_key: String,
    preshared_key: Option<String>,
}

impl KeyPair {
    /// Generate a new private key and preshared key
    pub fn generate(keys: &KeyFactory) -> Result<Self> {
        let private_key = keys.random_key()?;
        let preshared_key = keys.random_key()?;
        let mut pair = Self::from_private_key(private_key, keys)?;
        pair.preshared_key = Some(preshared_key);
        Ok(pair)
    }

    /// Build a pair from an existing private key
    pub fn from_private_key(private_key: impl Into<String>, keys: &KeyFactory) -> Result<Self> {
        let private_key = private_key.into().trim().to_string();
        let public_key = keys.derive_public_key(&private_key)?;
        Ok(Self {
            private_key: Some(private_key),
            public_key,
            preshared_key: None,
        })
    }

    /// Build a pair for a remote endpoint whose private key is not known
    pub fn from_public_key(public_key: impl Into<String>) -> Self {
        Self {
            private_key: None,
            public_key: public_key.into().trim().to_string(),
            preshared_key: None,
        }
    }

    /// Replacement pair for a revoked one
    pub fn revoke(&self, keys: &KeyFactory) -> Result<Self> {
        Self::generate(keys)
    }

    /// Builder pattern: attach a preshared key
    pub fn with_preshared_key(mut self, preshared_key: Option<String>) -> Self {
        self.preshared_key = preshared_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Get the private key, if held
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    /// Get the public key
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Get the preshared key
    ///
    /// Neither the tunnel text nor client exports carry it. It persists in
    /// the peer secret store and is printed by `wgconf genkey`.
    pub fn preshared_key(&self) -> Option<&str> {
        self.preshared_key.as_deref()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_key)
            .field("has_private", &self.private_key.is_some())
            .field("has_preshared", &self.preshared_key.is_some())
            .finish()
    }
}

fn decode_key(key: &str) -> Result<[u8; KEY_SIZE]> {
    let bytes = BASE64
        .decode(key.trim())
        .map_err(|e| WgError::KeyDerivationFailed(format!("invalid key encoding: {}", e)))?;

    bytes
        .try_into()
        .map_err(|_| WgError::KeyDerivationFailed("key must be 32 bytes".to_string()))
}
