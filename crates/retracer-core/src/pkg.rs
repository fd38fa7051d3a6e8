//! Debian package management behind a narrow interface.

use crate::error::{Result, RetracerError};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Packages the retracer host needs.
pub const PACKAGES: &[&str] = &[
    "apport-retrace",
    "git",
    "nginx-light",
    "python3-apt",
    "python3-requests",
];

/// The package providing the retracing workload; its version doubles as the
/// workload version reported to the operator.
pub const WORKLOAD_PACKAGE: &str = "apport-retrace";

pub trait PackageManager {
    /// Refresh the package index.
    fn refresh(&self) -> Result<()>;
    /// Install a single package, idempotent when already present.
    fn install(&self, package: &str) -> Result<()>;
    /// Installed version of the workload package, `"unknown"` when the
    /// query fails.
    fn workload_version(&self) -> String;
}

/// Production implementation shelling out to `apt-get` / `dpkg-query`.
pub struct AptGet {
    bin: PathBuf,
}

impl AptGet {
    pub fn new() -> Result<Self> {
        let bin = which::which("apt-get")
            .map_err(|_| RetracerError::BinaryNotFound("apt-get".to_string()))?;
        Ok(Self { bin })
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.bin)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .output()
            .map_err(|e| RetracerError::PackageManager(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RetracerError::PackageManager(format!(
                "apt-get {}: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl PackageManager for AptGet {
    fn refresh(&self) -> Result<()> {
        self.run(&["update"])?;
        debug!("package index refreshed");
        Ok(())
    }

    fn install(&self, package: &str) -> Result<()> {
        self.run(&["install", "-y", package])?;
        debug!(package, "package installed");
        Ok(())
    }

    fn workload_version(&self) -> String {
        let result = Command::new("dpkg-query")
            .args(["-W", "-f=${Version}", WORKLOAD_PACKAGE])
            .output();
        match result {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            _ => {
                warn!("failed to query '{WORKLOAD_PACKAGE}' version");
                "unknown".to_string()
            }
        }
    }
}
