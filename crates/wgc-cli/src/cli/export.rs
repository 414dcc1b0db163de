//! Export Command Implementation

use anyhow::{Context, Result};
use tracing::info;
use wgc_core::ClientOverrides;

use super::{AppContext, ExportArgs};

/// Print or write a client configuration
pub fn run(ctx: &AppContext, args: ExportArgs) -> Result<()> {
    let config = ctx.load_tunnel()?;

    let overrides = ClientOverrides {
        endpoint: args.endpoint.or_else(|| ctx.settings.default_endpoint.clone()),
        allowed_ips: args.allowed_ips,
        persistent_keepalive: args.keepalive,
    };

    let text = config.render_peer_client_config(&args.public_key, &overrides)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Client config written to {}", path.display());
        }
        None => print!("{}", text),
    }

    Ok(())
}
