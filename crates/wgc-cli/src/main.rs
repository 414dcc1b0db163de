//! WgConf CLI
//!
//! Command-line interface for managing a WireGuard tunnel configuration.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{AppContext, Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging, stdout is reserved for config text
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ctx = AppContext::load(cli.settings.as_deref(), cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Init(args) => cli::init::run(&ctx, args)?,
        Commands::Genkey { json } => cli::keys::genkey(&ctx, json)?,
        Commands::Pubkey { private_key } => cli::keys::pubkey(&ctx, &private_key)?,
        Commands::AddPeer(args) => cli::peer::add(&ctx, args)?,
        Commands::RemovePeer { public_key } => cli::peer::remove(&ctx, &public_key)?,
        Commands::Rotate { public_key } => cli::peer::rotate(&ctx, &public_key)?,
        Commands::Export(args) => cli::export::run(&ctx, args)?,
        Commands::Show { json } => cli::show::run(&ctx, json)?,
        Commands::Fingerprint => cli::show::fingerprint(&ctx)?,
    }

    Ok(())
}
