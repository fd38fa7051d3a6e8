//! Convergence of enabled worker units against the desired architecture set.
//!
//! Each pass rewrites the (static) unit files, reloads the unit definitions,
//! enables timers for every desired architecture, and retires units whose
//! architecture is no longer desired. A persisted record of the last applied
//! set backs up the filename-based discovery so correctness does not hinge
//! on directory listing alone.

use crate::config::ProxyConfig;
use crate::error::{Result, RetracerError};
use crate::systemd::{self, ServiceManager};
use crate::{io, paths, units};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Persisted unit state
// ---------------------------------------------------------------------------

/// Record of the architectures the last reconciliation pass applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub architectures: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl UnitState {
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::unit_state_path(root);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::unit_state_path(root), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Outcome of one reconciliation pass.
///
/// `retire_failures` carries architectures whose cleanup failed; the pass
/// still succeeds, but callers can surface the partial failure instead of
/// reporting a clean run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub enabled: Vec<String>,
    pub retired: Vec<String>,
    pub retire_failures: Vec<String>,
}

pub struct Reconciler<'a> {
    root: &'a Path,
    proxies: &'a ProxyConfig,
    manager: &'a dyn ServiceManager,
}

impl<'a> Reconciler<'a> {
    pub fn new(root: &'a Path, proxies: &'a ProxyConfig, manager: &'a dyn ServiceManager) -> Self {
        Self {
            root,
            proxies,
            manager,
        }
    }

    /// Converge enabled worker timers to exactly `desired`.
    ///
    /// Empty input is rejected before any file is touched. Unit files are
    /// rewritten unconditionally (the bodies are static, so rewriting is
    /// idempotent); retirement of stale architectures is best-effort per
    /// architecture.
    pub fn reconcile(&self, desired: &[String]) -> Result<ReconcileReport> {
        if desired.is_empty() {
            return Err(RetracerError::EmptyArchitectures);
        }
        for arch in desired {
            paths::validate_arch(arch)?;
        }

        self.write_unit_files()?;
        self.manager.daemon_reload()?;
        self.manager.enable_now(systemd::DUPCHECK_TIMER)?;

        let live = self.live_architectures()?;

        let mut report = ReconcileReport::default();
        for arch in desired {
            self.manager.enable_now(&systemd::worker_timer(arch))?;
            report.enabled.push(arch.clone());
        }

        for arch in &live {
            if desired.contains(arch) {
                continue;
            }
            match self.retire(arch) {
                Ok(()) => {
                    debug!(arch = %arch, "retired worker units");
                    report.retired.push(arch.clone());
                }
                Err(e) => {
                    warn!(arch = %arch, error = %e, "failed to retire worker units");
                    report.retire_failures.push(arch.clone());
                }
            }
        }

        UnitState {
            version: 1,
            architectures: desired.to_vec(),
            updated_at: Utc::now(),
        }
        .save(self.root)?;

        debug!(?report, "worker units synchronized");
        Ok(report)
    }

    fn write_unit_files(&self) -> Result<()> {
        let unit_dir = paths::unit_dir(self.root);
        io::ensure_dir(&unit_dir)?;

        io::atomic_write(
            &unit_dir.join(systemd::DUPCHECK_SERVICE),
            units::render_dupcheck_service(self.proxies).as_bytes(),
        )?;
        io::atomic_write(
            &unit_dir.join(systemd::DUPCHECK_TIMER),
            units::DUPCHECK_TIMER_BODY.as_bytes(),
        )?;
        io::atomic_write(
            &unit_dir.join(systemd::WORKER_SERVICE_TEMPLATE),
            units::render_worker_service(self.proxies).as_bytes(),
        )?;
        io::atomic_write(
            &unit_dir.join(systemd::WORKER_TIMER_TEMPLATE),
            units::WORKER_TIMER_BODY.as_bytes(),
        )?;
        Ok(())
    }

    /// Architectures with a live worker unit: the enabled-timers directory
    /// scan, unioned with the last persisted record. Filenames that do not
    /// match the worker timer pattern are ignored.
    fn live_architectures(&self) -> Result<Vec<String>> {
        let mut live: Vec<String> = Vec::new();

        let wants_dir = paths::enabled_timers_dir(self.root);
        if wants_dir.is_dir() {
            for entry in std::fs::read_dir(&wants_dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(arch) = systemd::arch_from_timer_filename(&name) {
                    if !live.iter().any(|a| a == arch) {
                        live.push(arch.to_string());
                    }
                }
            }
        }

        if let Some(state) = UnitState::load(self.root)? {
            for arch in state.architectures {
                if !live.contains(&arch) {
                    live.push(arch);
                }
            }
        }

        live.sort();
        Ok(live)
    }

    fn retire(&self, arch: &str) -> Result<()> {
        let timer = systemd::worker_timer(arch);
        let service = systemd::worker_service(arch);

        self.manager.stop(&timer)?;
        self.manager.stop(&service)?;
        self.manager.disable(&timer)?;

        let unit_dir = paths::unit_dir(self.root);
        remove_if_present(&unit_dir.join(&timer))?;
        remove_if_present(&unit_dir.join(&service))?;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
