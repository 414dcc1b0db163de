//! Show Command Implementations

use anyhow::Result;

use super::AppContext;

/// Print the canonical configuration or its JSON summary
pub fn run(ctx: &AppContext, json: bool) -> Result<()> {
    let config = ctx.load_tunnel()?;

    if json {
        println!("{}", config.summary_json()?);
    } else {
        print!("{}", config.render());
    }

    Ok(())
}

/// Print the content fingerprint
pub fn fingerprint(ctx: &AppContext) -> Result<()> {
    let config = ctx.load_tunnel()?;
    println!("{}", config.fingerprint());
    Ok(())
}
