use super::Context;
use anyhow::Result;
use retracer_core::StatusRecord;

pub fn run(ctx: &Context) -> Result<()> {
    let record = StatusRecord::load(&ctx.root)?;

    if ctx.json {
        match record {
            Some(r) => println!("{}", serde_json::to_string_pretty(&r)?),
            None => println!("{}", serde_json::json!({ "status": null })),
        }
        return Ok(());
    }

    match record {
        Some(r) => {
            println!("{}", r.status);
            if let Some(version) = r.workload_version {
                println!("workload version: {version}");
            }
            println!("updated: {}", r.updated_at.to_rfc3339());
        }
        None => println!("no status recorded yet"),
    }
    Ok(())
}
