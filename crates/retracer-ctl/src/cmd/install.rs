use super::Context;
use anyhow::Result;
use retracer_core::fetch::NetFetcher;
use retracer_core::pkg::AptGet;
use retracer_core::systemd::Systemctl;
use retracer_core::{parse_architectures, Retracer};

pub fn run(ctx: &Context, architectures: &str) -> Result<()> {
    let report = super::with_status(
        ctx,
        "Setting up environment",
        "Failed to set up the environment. Check logs for details.",
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
            retracer.install(&archs)
        },
    )?;

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
        println!("installed; enabled architectures: {}", report.enabled.join(" "));
    }
    Ok(())
}
