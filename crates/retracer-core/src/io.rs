use crate::error::{Result, RetracerError};
use nix::unistd::{Gid, Group, Uid, User};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting unit files and state records.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Create or truncate `path` with mode 0600 and write `data`.
/// Used for the credential blob; never widens permissions on rewrite.
pub fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    f.write_all(data)?;
    // An existing file keeps its old mode; force it back down.
    let mut perms = f.metadata()?.permissions();
    use std::os::unix::fs::PermissionsExt;
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Ownership
// ---------------------------------------------------------------------------

/// Named service account that owns the retracer's files. `None` at call
/// sites means "leave ownership alone" (unprivileged runs, tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user: String,
    pub group: String,
}

impl Account {
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }

    /// Parse `user:group` (or bare `user`, reusing it as the group).
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((u, g)) => Self::new(u, g),
            None => Self::new(s, s),
        }
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user, self.group)
    }
}

fn resolve(account: &Account) -> std::result::Result<(Uid, Gid), String> {
    let user = User::from_name(&account.user)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no such user '{}'", account.user))?;
    let group = Group::from_name(&account.group)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no such group '{}'", account.group))?;
    Ok((user.uid, group.gid))
}

/// Change ownership of `path` to the given account, when one is configured.
pub fn chown_path(path: &Path, owner: Option<&Account>) -> Result<()> {
    let Some(account) = owner else {
        return Ok(());
    };
    let (uid, gid) = resolve(account).map_err(|detail| RetracerError::Chown {
        path: path.display().to_string(),
        owner: account.to_string(),
        detail,
    })?;
    nix::unistd::chown(path, Some(uid), Some(gid)).map_err(|e| RetracerError::Chown {
        path: path.display().to_string(),
        owner: account.to_string(),
        detail: e.to_string(),
    })
}

/// Create a directory (and parents) and hand it to the service account.
pub fn ensure_owned_dir(path: &Path, owner: Option<&Account>) -> Result<()> {
    ensure_dir(path)?;
    chown_path(path, owner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
