//! Peer Command Implementations

use anyhow::Result;
use wgc_core::PeerParams;

use super::{AddPeerArgs, AppContext};

/// Add a peer and save the tunnel
pub fn add(ctx: &AppContext, args: AddPeerArgs) -> Result<()> {
    let mut config = ctx.load_tunnel()?;

    let params = PeerParams {
        private_key: args.private_key,
        public_key: args.public_key,
        preshared_key: None,
        allowed_ips: args.allowed_ips,
        persistent_keepalive: args.keepalive.or(ctx.settings.default_keepalive),
        endpoint: args.endpoint,
    };

    let peer = config.add_peer(params)?.clone();
    ctx.save_tunnel(&config)?;

    println!("Added peer {}", peer.public_key());
    println!("  allowed ips: {}", peer.allowed_ips().join(", "));
    if peer.key_pair().private_key().is_some() {
        println!("  secrets:     {}", ctx.secrets_path().display());
    }
    Ok(())
}

/// Remove a peer and save the tunnel
pub fn remove(ctx: &AppContext, public_key: &str) -> Result<()> {
    let mut config = ctx.load_tunnel()?;
    let peer = config.remove_peer(public_key)?;
    ctx.save_tunnel(&config)?;

    println!("Removed peer {} ({})", peer.public_key(), peer.allowed_ips().join(", "));
    Ok(())
}

/// Rotate a peer's keys and save the tunnel
pub fn rotate(ctx: &AppContext, public_key: &str) -> Result<()> {
    let mut config = ctx.load_tunnel()?;
    let new_key = config.rotate_peer_keys(public_key)?.public_key().to_string();
    ctx.save_tunnel(&config)?;

    println!("Rotated peer {} -> {}", public_key, new_key);
    Ok(())
}
