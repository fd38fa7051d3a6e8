use crate::error::{Result, RetracerError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Fixed layout
// ---------------------------------------------------------------------------
//
// Every path is expressed relative to a root directory so the whole tree can
// be redirected into a tempdir under test. Production uses `/`.

pub const CONFIG_CHECKOUT: &str = "app/config-apport";
pub const WORKER_WRAPPER: &str = "app/retracer-worker-wrapper";
pub const LP_CREDENTIALS: &str = "app/launchpad-credentials";

pub const SRV_DIR: &str = "srv/retracers";
pub const PUBLISH_DIR: &str = "srv/retracers/apport-duplicates";
pub const CRASHDB_FILE: &str = "srv/retracers/apport_duplicates.db";
pub const UNIT_STATE_FILE: &str = "srv/retracers/worker-units.yaml";
pub const STATUS_FILE: &str = "srv/retracers/status.yaml";

pub const UBUNTU_HOME: &str = "home/ubuntu";
pub const DEBUG_SYMBOLS_DIR: &str = "usr/lib/debug/.dwz";

pub const UNIT_DIR: &str = "etc/systemd/system";
pub const ENABLED_TIMERS_DIR: &str = "etc/systemd/system/timers.target.wants";

pub const NGINX_SITE_CONFIG: &str = "etc/nginx/conf.d/crashdb.conf";
pub const NGINX_DEFAULT_SITE: &str = "etc/nginx/sites-enabled/default";

pub const SECRETS_DIR: &str = "etc/launchpad-retracer/secrets";

pub const CONFIG_REPO_URL: &str =
    "https://git.launchpad.net/~ubuntu-archive/+git/lp-retracer-config";
pub const CRASHDB_URL: &str =
    "https://ubuntu-archive-team.ubuntu.com/apport-duplicates/apport_duplicates.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_checkout(root: &Path) -> PathBuf {
    root.join(CONFIG_CHECKOUT)
}

pub fn worker_wrapper(root: &Path) -> PathBuf {
    root.join(WORKER_WRAPPER)
}

pub fn credentials_path(root: &Path) -> PathBuf {
    root.join(LP_CREDENTIALS)
}

pub fn srv_dir(root: &Path) -> PathBuf {
    root.join(SRV_DIR)
}

pub fn publish_dir(root: &Path) -> PathBuf {
    root.join(PUBLISH_DIR)
}

pub fn crashdb_path(root: &Path) -> PathBuf {
    root.join(CRASHDB_FILE)
}

pub fn unit_state_path(root: &Path) -> PathBuf {
    root.join(UNIT_STATE_FILE)
}

pub fn status_path(root: &Path) -> PathBuf {
    root.join(STATUS_FILE)
}

pub fn arch_cache_dir(root: &Path, arch: &str) -> PathBuf {
    root.join(UBUNTU_HOME).join(format!("cache-{arch}"))
}

pub fn debug_symbols_dir(root: &Path) -> PathBuf {
    root.join(DEBUG_SYMBOLS_DIR)
}

pub fn unit_dir(root: &Path) -> PathBuf {
    root.join(UNIT_DIR)
}

pub fn enabled_timers_dir(root: &Path) -> PathBuf {
    root.join(ENABLED_TIMERS_DIR)
}

pub fn nginx_site_config(root: &Path) -> PathBuf {
    root.join(NGINX_SITE_CONFIG)
}

pub fn nginx_default_site(root: &Path) -> PathBuf {
    root.join(NGINX_DEFAULT_SITE)
}

pub fn secrets_dir(root: &Path) -> PathBuf {
    root.join(SECRETS_DIR)
}

// ---------------------------------------------------------------------------
// Architecture validation
// ---------------------------------------------------------------------------

static ARCH_RE: OnceLock<Regex> = OnceLock::new();

fn arch_re() -> &'static Regex {
    ARCH_RE.get_or_init(|| Regex::new(r"^[a-z0-9]+$").unwrap())
}

/// Validate a CPU architecture identifier (amd64, arm64, s390x, ...).
pub fn validate_arch(arch: &str) -> Result<()> {
    if arch.is_empty() || arch.len() > 32 || !arch_re().is_match(arch) {
        return Err(RetracerError::InvalidArchitecture(arch.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
