//! Lifecycle sequences for the retracer host.
//!
//! Three entry points — install, configure, start — each a fail-fast chain
//! of steps over the OS collaborators. Already-applied side effects are not
//! rolled back when a later step fails; the operator re-runs the operation
//! after fixing the reported cause.

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::io::{self, Account};
use crate::pkg::{self, PackageManager};
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::systemd::ServiceManager;
use crate::{paths, units};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const NGINX_SERVICE: &str = "nginx";

pub struct Retracer<'a> {
    root: PathBuf,
    owner: Option<Account>,
    proxies: ProxyConfig,
    manager: &'a dyn ServiceManager,
    packages: &'a dyn PackageManager,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Retracer<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        owner: Option<Account>,
        proxies: ProxyConfig,
        manager: &'a dyn ServiceManager,
        packages: &'a dyn PackageManager,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            root: root.into(),
            owner,
            proxies,
            manager,
            packages,
            fetcher,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn owner(&self) -> Option<&Account> {
        self.owner.as_ref()
    }

    /// One-time environment setup. Also safe to re-run on upgrade: every
    /// step skips or overwrites cleanly.
    pub fn install(&self, architectures: &[String]) -> Result<ReconcileReport> {
        self.install_packages()?;
        self.fetcher
            .clone_repo(paths::CONFIG_REPO_URL, &paths::config_checkout(&self.root))?;
        self.install_worker_wrapper()?;
        self.create_directories(architectures)?;
        self.download_crashdb()?;
        let report = self.reconcile(architectures)?;
        self.install_nginx_site()?;
        info!("retracer environment installed");
        Ok(report)
    }

    /// Idempotent re-entrant path, run whenever the architecture set or the
    /// credentials change.
    pub fn configure(&self, architectures: &[String]) -> Result<ReconcileReport> {
        self.create_directories(architectures)?;
        let report = self.reconcile(architectures)?;
        info!("retracer configured");
        Ok(report)
    }

    /// Bring the service up: refresh the config checkout and restart the
    /// reverse proxy.
    pub fn start(&self) -> Result<()> {
        self.fetcher
            .update_checkout(&paths::config_checkout(&self.root))?;
        self.manager.restart(NGINX_SERVICE)?;
        info!("retracer started");
        Ok(())
    }

    pub fn workload_version(&self) -> String {
        self.packages.workload_version()
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn install_packages(&self) -> Result<()> {
        self.packages.refresh()?;
        for package in pkg::PACKAGES {
            self.packages.install(package)?;
        }
        Ok(())
    }

    fn install_worker_wrapper(&self) -> Result<()> {
        let dest = paths::worker_wrapper(&self.root);
        io::atomic_write(&dest, units::WORKER_WRAPPER_BODY.as_bytes())?;
        let mut perms = std::fs::metadata(&dest)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&dest, perms)?;
        debug!("worker wrapper script installed");
        Ok(())
    }

    fn create_directories(&self, architectures: &[String]) -> Result<()> {
        let owner = self.owner.as_ref();
        io::ensure_owned_dir(&paths::srv_dir(&self.root), owner)?;
        io::ensure_owned_dir(&paths::publish_dir(&self.root), owner)?;
        for arch in architectures {
            io::ensure_owned_dir(&paths::arch_cache_dir(&self.root, arch), owner)?;
        }
        // apport needs this present when retracing in sandbox mode
        io::ensure_owned_dir(&paths::debug_symbols_dir(&self.root), owner)?;
        Ok(())
    }

    fn download_crashdb(&self) -> Result<()> {
        let dest = paths::crashdb_path(&self.root);
        if dest.exists() {
            debug!("crash database already present, skipping download");
            return Ok(());
        }
        self.fetcher.download(paths::CRASHDB_URL, &dest)?;
        io::chown_path(&dest, self.owner.as_ref())
    }

    fn reconcile(&self, architectures: &[String]) -> Result<ReconcileReport> {
        Reconciler::new(&self.root, &self.proxies, self.manager).reconcile(architectures)
    }

    fn install_nginx_site(&self) -> Result<()> {
        io::atomic_write(
            &paths::nginx_site_config(&self.root),
            units::NGINX_SITE_BODY.as_bytes(),
        )?;
        // The stock default site would shadow ours on port 80.
        let default_site = paths::nginx_default_site(&self.root);
        match std::fs::remove_file(&default_site) {
            Ok(()) => debug!("default nginx site removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetracerError;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    struct FakeInit {
        enabled: RefCell<BTreeSet<String>>,
        restarted: RefCell<Vec<String>>,
    }

    impl FakeInit {
        fn new() -> Self {
            Self {
                enabled: RefCell::new(BTreeSet::new()),
                restarted: RefCell::new(Vec::new()),
            }
        }
    }

    impl ServiceManager for FakeInit {
        fn daemon_reload(&self) -> Result<()> {
            Ok(())
        }
        fn enable_now(&self, unit: &str) -> Result<()> {
            self.enabled.borrow_mut().insert(unit.to_string());
            Ok(())
        }
        fn stop(&self, _unit: &str) -> Result<()> {
            Ok(())
        }
        fn disable(&self, unit: &str) -> Result<()> {
            self.enabled.borrow_mut().remove(unit);
            Ok(())
        }
        fn restart(&self, unit: &str) -> Result<()> {
            self.restarted.borrow_mut().push(unit.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePkg {
        refreshed: RefCell<bool>,
        installed: RefCell<Vec<String>>,
        fail_install: Option<String>,
    }

    impl PackageManager for FakePkg {
        fn refresh(&self) -> Result<()> {
            *self.refreshed.borrow_mut() = true;
            Ok(())
        }
        fn install(&self, package: &str) -> Result<()> {
            if self.fail_install.as_deref() == Some(package) {
                return Err(RetracerError::PackageManager(format!(
                    "unable to locate package {package}"
                )));
            }
            self.installed.borrow_mut().push(package.to_string());
            Ok(())
        }
        fn workload_version(&self) -> String {
            "2.28.0-0ubuntu1".to_string()
        }
    }

    #[derive(Default)]
    struct FakeFetch {
        cloned: RefCell<Vec<(String, PathBuf)>>,
        pulled: RefCell<Vec<PathBuf>>,
        downloaded: RefCell<Vec<String>>,
    }

    impl Fetcher for FakeFetch {
        fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
            if dest.exists() {
                return Ok(());
            }
            std::fs::create_dir_all(dest)?;
            self.cloned
                .borrow_mut()
                .push((url.to_string(), dest.to_path_buf()));
            Ok(())
        }
        fn update_checkout(&self, dir: &Path) -> Result<()> {
            self.pulled.borrow_mut().push(dir.to_path_buf());
            Ok(())
        }
        fn download(&self, url: &str, dest: &Path) -> Result<()> {
            self.downloaded.borrow_mut().push(url.to_string());
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(dest, b"db")?;
            Ok(())
        }
    }

    fn retracer<'a>(
        dir: &TempDir,
        init: &'a FakeInit,
        pkgs: &'a FakePkg,
        fetch: &'a FakeFetch,
    ) -> Retracer<'a> {
        Retracer::new(
            dir.path(),
            None,
            ProxyConfig::default(),
            init,
            pkgs,
            fetch,
        )
    }

    fn archs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn install_provisions_the_full_environment() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());
        let r = retracer(&dir, &init, &pkgs, &fetch);

        r.install(&archs(&["amd64", "arm64"])).unwrap();

        assert!(*pkgs.refreshed.borrow());
        assert_eq!(pkgs.installed.borrow().len(), pkg::PACKAGES.len());
        assert_eq!(fetch.cloned.borrow().len(), 1);
        assert_eq!(fetch.downloaded.borrow().len(), 1);
        assert!(paths::config_checkout(dir.path()).is_dir());
        assert!(paths::worker_wrapper(dir.path()).exists());
        assert!(paths::crashdb_path(dir.path()).exists());
        assert!(paths::publish_dir(dir.path()).is_dir());
        assert!(paths::arch_cache_dir(dir.path(), "amd64").is_dir());
        assert!(paths::arch_cache_dir(dir.path(), "arm64").is_dir());
        assert!(paths::debug_symbols_dir(dir.path()).is_dir());
        assert!(paths::nginx_site_config(dir.path()).exists());
        assert!(init
            .enabled
            .borrow()
            .contains("launchpad-retracer-worker@amd64.timer"));
    }

    #[test]
    fn install_wrapper_script_is_executable() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());
        retracer(&dir, &init, &pkgs, &fetch)
            .install(&archs(&["amd64"]))
            .unwrap();

        let mode = std::fs::metadata(paths::worker_wrapper(dir.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn install_skips_existing_checkout_and_crashdb() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());
        std::fs::create_dir_all(paths::config_checkout(dir.path())).unwrap();
        std::fs::create_dir_all(paths::srv_dir(dir.path())).unwrap();
        std::fs::write(paths::crashdb_path(dir.path()), b"existing").unwrap();

        retracer(&dir, &init, &pkgs, &fetch)
            .install(&archs(&["amd64"]))
            .unwrap();

        assert!(fetch.cloned.borrow().is_empty());
        assert!(fetch.downloaded.borrow().is_empty());
        assert_eq!(
            std::fs::read(paths::crashdb_path(dir.path())).unwrap(),
            b"existing"
        );
    }

    #[test]
    fn install_removes_default_nginx_site() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());
        let default_site = paths::nginx_default_site(dir.path());
        std::fs::create_dir_all(default_site.parent().unwrap()).unwrap();
        std::fs::write(&default_site, b"default").unwrap();

        retracer(&dir, &init, &pkgs, &fetch)
            .install(&archs(&["amd64"]))
            .unwrap();

        assert!(!default_site.exists());
    }

    #[test]
    fn install_fails_fast_on_package_error() {
        let dir = TempDir::new().unwrap();
        let init = FakeInit::new();
        let pkgs = FakePkg {
            fail_install: Some("nginx-light".to_string()),
            ..FakePkg::default()
        };
        let fetch = FakeFetch::default();

        let err = retracer(&dir, &init, &pkgs, &fetch)
            .install(&archs(&["amd64"]))
            .unwrap_err();

        assert!(matches!(err, RetracerError::PackageManager(_)));
        // Nothing after the failing step ran.
        assert!(fetch.cloned.borrow().is_empty());
        assert!(!paths::worker_wrapper(dir.path()).exists());
    }

    #[test]
    fn configure_creates_dirs_and_reconciles_only() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());

        let report = retracer(&dir, &init, &pkgs, &fetch)
            .configure(&archs(&["amd64", "riscv64"]))
            .unwrap();

        assert_eq!(report.enabled, archs(&["amd64", "riscv64"]));
        assert!(pkgs.installed.borrow().is_empty());
        assert!(fetch.downloaded.borrow().is_empty());
        assert!(paths::arch_cache_dir(dir.path(), "riscv64").is_dir());
    }

    #[test]
    fn configure_rejects_empty_architectures() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());

        let err = retracer(&dir, &init, &pkgs, &fetch)
            .configure(&[])
            .unwrap_err();
        assert!(matches!(err, RetracerError::EmptyArchitectures));
    }

    #[test]
    fn start_pulls_checkout_and_restarts_nginx() {
        let dir = TempDir::new().unwrap();
        let (init, pkgs, fetch) = (FakeInit::new(), FakePkg::default(), FakeFetch::default());

        retracer(&dir, &init, &pkgs, &fetch).start().unwrap();

        assert_eq!(
            fetch.pulled.borrow().as_slice(),
            &[paths::config_checkout(dir.path())]
        );
        assert_eq!(init.restarted.borrow().as_slice(), &["nginx".to_string()]);
    }
}
