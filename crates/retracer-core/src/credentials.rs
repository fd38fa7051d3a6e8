//! Launchpad credential blob handling.
//!
//! The content is opaque; this module only guarantees placement, 0600
//! permissions, and ownership by the service account.

use crate::error::Result;
use crate::io::{self, Account};
use crate::paths;
use std::path::Path;
use tracing::debug;

/// Write the credential blob to its fixed path with mode 0600, creating or
/// truncating as needed, then hand it to the service account.
pub fn import_credentials(root: &Path, content: &str, owner: Option<&Account>) -> Result<()> {
    let path = paths::credentials_path(root);
    io::write_private(&path, content.as_bytes())?;
    io::chown_path(&path, owner)?;
    debug!("launchpad credentials imported");
    Ok(())
}

/// Whether a credential blob has been imported on this host.
pub fn has_credentials(root: &Path) -> bool {
    paths::credentials_path(root).exists()
}
