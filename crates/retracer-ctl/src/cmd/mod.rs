pub mod configure;
pub mod credentials;
pub mod install;
pub mod start;
pub mod status;

use anyhow::Result;
use retracer_core::{Account, ProxyConfig, RetracerError, Status, StatusRecord};
use std::path::{Path, PathBuf};

/// Shared invocation context built from the global CLI flags.
pub struct Context {
    pub root: PathBuf,
    pub owner: Option<Account>,
    pub proxies: ProxyConfig,
    pub json: bool,
}

impl Context {
    pub fn secrets_dir(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| retracer_core::paths::secrets_dir(&self.root))
    }
}

/// Persist a status record, ignoring persistence failures: a broken status
/// file must not mask the underlying operation result.
pub fn record_status(root: &Path, record: StatusRecord) {
    if let Err(e) = record.save(root) {
        tracing::warn!(error = %e, "failed to persist status record");
    }
}

/// Map an operation failure onto the operator-facing blocked reason. Secret
/// errors get their specific reasons; everything else falls back to the
/// per-operation message.
pub fn blocked_reason(e: &RetracerError, fallback: &str) -> String {
    match e {
        RetracerError::SecretNotFound(_) | RetracerError::SecretNotGranted(_) => {
            "Secret not available. Check that access was granted.".to_string()
        }
        RetracerError::SecretKeyMissing { key, .. } => {
            format!("Secret not available. Check that the '{key}' key exists.")
        }
        RetracerError::EmptyArchitectures => {
            "Config 'architectures' cannot be empty.".to_string()
        }
        _ => fallback.to_string(),
    }
}

/// Run one lifecycle operation with the tri-state status protocol:
/// transitioning while in flight, ready on success, blocked(reason) on
/// failure. The underlying error still propagates for the exit code.
pub fn with_status<T>(
    ctx: &Context,
    transitioning: &str,
    blocked_fallback: &str,
    op: impl FnOnce() -> retracer_core::Result<T>,
) -> Result<T> {
    record_status(
        &ctx.root,
        StatusRecord::new(Status::Transitioning(transitioning.to_string())),
    );
    match op() {
        Ok(value) => {
            record_status(&ctx.root, StatusRecord::new(Status::Ready));
            Ok(value)
        }
        Err(e) => {
            let reason = blocked_reason(&e, blocked_fallback);
            record_status(&ctx.root, StatusRecord::new(Status::Blocked(reason.clone())));
            Err(anyhow::Error::new(e).context(reason))
        }
    }
}
