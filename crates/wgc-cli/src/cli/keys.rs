//! Key Command Implementations

use anyhow::Result;
use serde::Serialize;
use wgc_core::KeyPair;

use super::AppContext;

#[derive(Serialize)]
struct GeneratedKeys<'a> {
    private_key: &'a str,
    public_key: &'a str,
    preshared_key: Option<&'a str>,
}

/// Print a freshly generated key triple
pub fn genkey(ctx: &AppContext, json: bool) -> Result<()> {
    let pair = KeyPair::generate(&ctx.settings.key_factory())?;
    let keys = GeneratedKeys {
        private_key: pair.private_key().unwrap_or_default(),
        public_key: pair.public_key(),
        preshared_key: pair.preshared_key(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        println!("PrivateKey = {}", keys.private_key);
        println!("PublicKey = {}", keys.public_key);
        if let Some(psk) = keys.preshared_key {
            println!("PresharedKey = {}", psk);
        }
    }

    Ok(())
}

/// Print the public key for `private_key`
pub fn pubkey(ctx: &AppContext, private_key: &str) -> Result<()> {
    let pair = KeyPair::from_private_key(private_key, &ctx.settings.key_factory())?;
    println!("{}", pair.public_key());
    Ok(())
}
