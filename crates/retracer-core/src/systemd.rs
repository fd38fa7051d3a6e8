//! Narrow interface to the init system.
//!
//! The reconciler and lifecycle controller never shell out to `systemctl`
//! directly; they go through [`ServiceManager`] so unit handling can be
//! exercised against an in-memory fake.

use crate::error::{Result, RetracerError};
use std::path::PathBuf;
use std::process::Command;

// ---------------------------------------------------------------------------
// Unit names
// ---------------------------------------------------------------------------

pub const DUPCHECK_SERVICE: &str = "launchpad-retracer-dupcheck.service";
pub const DUPCHECK_TIMER: &str = "launchpad-retracer-dupcheck.timer";
pub const WORKER_SERVICE_TEMPLATE: &str = "launchpad-retracer-worker@.service";
pub const WORKER_TIMER_TEMPLATE: &str = "launchpad-retracer-worker@.timer";

const WORKER_PREFIX: &str = "launchpad-retracer-worker@";
const TIMER_SUFFIX: &str = ".timer";

pub fn worker_service(arch: &str) -> String {
    format!("{WORKER_PREFIX}{arch}.service")
}

pub fn worker_timer(arch: &str) -> String {
    format!("{WORKER_PREFIX}{arch}{TIMER_SUFFIX}")
}

/// Extract the architecture token from an enabled worker timer filename.
/// Anything not shaped like `launchpad-retracer-worker@<arch>.timer`
/// (including an empty instance) yields `None`.
pub fn arch_from_timer_filename(name: &str) -> Option<&str> {
    let arch = name.strip_prefix(WORKER_PREFIX)?.strip_suffix(TIMER_SUFFIX)?;
    if arch.is_empty() {
        return None;
    }
    Some(arch)
}

// ---------------------------------------------------------------------------
// Service manager interface
// ---------------------------------------------------------------------------

pub trait ServiceManager {
    /// Re-read unit definitions after files change on disk.
    fn daemon_reload(&self) -> Result<()>;
    /// Enable a unit and start it immediately. Idempotent on the init side.
    fn enable_now(&self, unit: &str) -> Result<()>;
    fn stop(&self, unit: &str) -> Result<()>;
    fn disable(&self, unit: &str) -> Result<()>;
    fn restart(&self, unit: &str) -> Result<()>;
}

/// Production implementation shelling out to `systemctl`.
pub struct Systemctl {
    bin: PathBuf,
}

impl Systemctl {
    pub fn new() -> Result<Self> {
        let bin = which::which("systemctl")
            .map_err(|_| RetracerError::BinaryNotFound("systemctl".to_string()))?;
        Ok(Self { bin })
    }

    fn run(&self, action: &'static str, unit: &str, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.bin)
            .args(args)
            .output()
            .map_err(|e| RetracerError::ServiceManager {
                unit: unit.to_string(),
                action,
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetracerError::ServiceManager {
                unit: unit.to_string(),
                action,
                detail: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl ServiceManager for Systemctl {
    fn daemon_reload(&self) -> Result<()> {
        self.run("daemon-reload", "-", &["daemon-reload"])
    }

    fn enable_now(&self, unit: &str) -> Result<()> {
        self.run("enable", unit, &["enable", "--now", unit])
    }

    fn stop(&self, unit: &str) -> Result<()> {
        self.run("stop", unit, &["stop", unit])
    }

    fn disable(&self, unit: &str) -> Result<()> {
        self.run("disable", unit, &["disable", unit])
    }

    fn restart(&self, unit: &str) -> Result<()> {
        self.run("restart", unit, &["restart", unit])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_unit_names() {
        assert_eq!(worker_timer("amd64"), "launchpad-retracer-worker@amd64.timer");
        assert_eq!(
            worker_service("s390x"),
            "launchpad-retracer-worker@s390x.service"
        );
    }

    #[test]
    fn arch_extraction_from_timer_filename() {
        assert_eq!(
            arch_from_timer_filename("launchpad-retracer-worker@arm64.timer"),
            Some("arm64")
        );
    }

    #[test]
    fn arch_extraction_ignores_malformed_names() {
        for name in [
            "launchpad-retracer-worker@.timer",
            "launchpad-retracer-worker@amd64.service",
            "launchpad-retracer-dupcheck.timer",
            "other-unit@amd64.timer",
            "README",
        ] {
            assert_eq!(arch_from_timer_filename(name), None, "accepted: {name}");
        }
    }
}
