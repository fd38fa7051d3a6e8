use super::Context;
use anyhow::Result;
use retracer_core::{credentials, secrets};
use std::path::Path;

pub fn run(ctx: &Context, credentials_id: &str, secrets_dir: Option<&Path>) -> Result<()> {
    super::with_status(
        ctx,
        "Importing launchpad credentials",
        "Failed to import the launchpad credentials. Check logs for details.",
        || {
            let blob = secrets::load_credentials(&ctx.secrets_dir(secrets_dir), credentials_id)?;
            credentials::import_credentials(&ctx.root, &blob, ctx.owner.as_ref())
        },
    )?;

    if ctx.json {
        println!("{}", serde_json::json!({ "imported": true }));
    } else {
        println!("credentials imported");
    }
    Ok(())
}
