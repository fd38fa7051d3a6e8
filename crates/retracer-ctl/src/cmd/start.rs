use super::{record_status, Context};
use anyhow::Result;
use retracer_core::fetch::NetFetcher;
use retracer_core::pkg::AptGet;
use retracer_core::systemd::Systemctl;
use retracer_core::{credentials, Retracer, Status, StatusRecord};

pub fn run(ctx: &Context) -> Result<()> {
    if !credentials::has_credentials(&ctx.root) {
        let reason = "Launchpad credentials not available.";
        record_status(&ctx.root, StatusRecord::new(Status::Blocked(reason.into())));
        anyhow::bail!(reason);
    }

    let version = super::with_status(
        ctx,
        "Starting retracer service",
        "Failed to start services. Check logs for details.",
        || {
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
            retracer.start()?;
            Ok(retracer.workload_version())
        },
    )?;

    // Re-record ready with the workload version attached.
    record_status(
        &ctx.root,
        StatusRecord::new(Status::Ready).with_workload_version(version.clone()),
    );

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({ "status": "ready", "workload_version": version })
        );
    } else {
        println!("started; workload version {version}");
    }
    Ok(())
}
