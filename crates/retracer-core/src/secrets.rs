//! Access to secrets granted by the hosting orchestrator.
//!
//! A granted secret is a YAML mapping of string keys to string values at
//! `<secrets-dir>/<id>.yaml`. The retracer only cares about one key,
//! `lpcredentials`, whose value is the opaque credential blob. The three
//! failure modes stay distinct so the operator sees the right reason:
//! secret missing, secret unreadable, expected key absent.

use crate::error::{Result, RetracerError};
use std::collections::BTreeMap;
use std::path::Path;

pub const CREDENTIALS_KEY: &str = "lpcredentials";

/// Load the credential blob from the secret with the given id.
pub fn load_credentials(secrets_dir: &Path, id: &str) -> Result<String> {
    let path = secrets_dir.join(format!("{id}.yaml"));
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RetracerError::SecretNotFound(id.to_string()));
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RetracerError::SecretNotGranted(id.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    let content: BTreeMap<String, String> = serde_yaml::from_str(&raw)?;
    match content.get(CREDENTIALS_KEY) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(RetracerError::SecretKeyMissing {
            id: id.to_string(),
            key: CREDENTIALS_KEY.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_secret(dir: &Path, id: &str, body: &str) {
        std::fs::write(dir.join(format!("{id}.yaml")), body).unwrap();
    }

    #[test]
    fn loads_credential_value() {
        let dir = TempDir::new().unwrap();
        write_secret(dir.path(), "lp-creds", "lpcredentials: oauth-blob\n");
        assert_eq!(
            load_credentials(dir.path(), "lp-creds").unwrap(),
            "oauth-blob"
        );
    }

    #[test]
    fn missing_secret_is_not_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_credentials(dir.path(), "absent"),
            Err(RetracerError::SecretNotFound(_))
        ));
    }

    #[test]
    fn missing_key_is_distinct_from_not_granted() {
        let dir = TempDir::new().unwrap();
        write_secret(dir.path(), "lp-creds", "someother: value\n");
        let err = load_credentials(dir.path(), "lp-creds").unwrap_err();
        assert!(matches!(err, RetracerError::SecretKeyMissing { .. }));
    }

    #[test]
    fn empty_value_counts_as_missing_key() {
        let dir = TempDir::new().unwrap();
        write_secret(dir.path(), "lp-creds", "lpcredentials: \"\"\n");
        assert!(matches!(
            load_credentials(dir.path(), "lp-creds"),
            Err(RetracerError::SecretKeyMissing { .. })
        ));
    }
}
