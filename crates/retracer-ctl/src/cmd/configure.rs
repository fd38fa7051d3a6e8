use super::Context;
use anyhow::Result;
use retracer_core::fetch::NetFetcher;
use retracer_core::pkg::AptGet;
use retracer_core::systemd::Systemctl;
use retracer_core::{credentials, parse_architectures, secrets, Retracer};
use std::path::Path;

pub fn run(
    ctx: &Context,
    architectures: &str,
    credentials_id: &str,
    secrets_dir: Option<&Path>,
) -> Result<()> {
    // Credential import first, mirroring the configure flow's contract:
    // a credentials change alone must land even if reconciliation then fails.
    super::with_status(
        ctx,
        "Importing launchpad credentials",
        "Failed to import the launchpad credentials. Check logs for details.",
        || {
            let blob = secrets::load_credentials(&ctx.secrets_dir(secrets_dir), credentials_id)?;
            credentials::import_credentials(&ctx.root, &blob, ctx.owner.as_ref())
        },
    )?;

    let report = super::with_status(
        ctx,
        "Configuring retracer",
        "Failed to configure the retracer. Check logs for details.",
        || {
            let archs = parse_architectures(architectures)?;
            let manager = Systemctl::new()?;
            let packages = AptGet::new()?;
            let fetcher = NetFetcher::new(ctx.proxies.clone())?;
            let retracer = Retracer::new(
                &ctx.root,
                ctx.owner.clone(),
                ctx.proxies.clone(),
                &manager,
                &packages,
                &fetcher,
            );
            retracer.configure(&archs)
        },
    )?;

    if !report.retire_failures.is_empty() {
        eprintln!(
            "warning: failed to retire: {}",
            report.retire_failures.join(" ")
        );
    }

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "enabled": report.enabled,
                "retired": report.retired,
                "retire_failures": report.retire_failures,
            })
        );
    } else {
        println!(
            "configured; enabled architectures: {}",
            report.enabled.join(" ")
        );
    }
    Ok(())
}
