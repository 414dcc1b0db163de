//! Init Command Implementation

use anyhow::{bail, Result};
use tracing::info;
use wgc_core::{brand, KeyPair, TunnelConfig, TunnelParams};

use super::{AppContext, InitArgs};

/// Run the init command
pub fn run(ctx: &AppContext, args: InitArgs) -> Result<()> {
    if ctx.tunnel_path.exists() && !args.force {
        bail!(
            "{} already exists, pass --force to overwrite",
            ctx.tunnel_path.display()
        );
    }

    let keys = ctx.settings.key_factory();
    let private_key = match args.private_key {
        Some(key) => key,
        None => KeyPair::generate(&keys)?
            .private_key()
            .unwrap_or_default()
            .to_string(),
    };

    let params = TunnelParams {
        addresses: args.address,
        listen_port: args.listen_port,
        private_key,
        dns: args.dns.or_else(|| ctx.settings.default_dns.clone()),
        mtu: args.mtu.or(ctx.settings.default_mtu),
        pre_up: args.pre_up,
        post_up: args.post_up,
        pre_down: args.pre_down,
        post_down: args.post_down,
        ..Default::default()
    };

    let config = TunnelConfig::with_keys(params, keys)?;
    ctx.save_tunnel(&config)?;

    info!("Wrote {}", ctx.tunnel_path.display());
    println!("{} tunnel initialised", brand::PRODUCT_NAME);
    println!("  file:       {}", ctx.tunnel_path.display());
    println!("  public key: {}", config.public_key());
    println!("  addresses:  {}", config.addresses().join(", "));

    Ok(())
}
