//! Coarse status surface reported to the hosting orchestrator.
//!
//! Three states: ready, transitioning (an operation is in flight), blocked
//! with a human-readable reason. The last state is persisted under the
//! service tree so `retracer-ctl status` can answer without re-probing.

use crate::error::Result;
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum Status {
    Ready,
    Transitioning(String),
    Blocked(String),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ready => write!(f, "ready"),
            Status::Transitioning(msg) => write!(f, "transitioning: {msg}"),
            Status::Blocked(reason) => write!(f, "blocked: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_version: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            workload_version: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_workload_version(mut self, version: impl Into<String>) -> Self {
        self.workload_version = Some(version.into());
        self
    }

    pub fn load(root: &Path) -> Result<Option<Self>> {
        let path = paths::status_path(root);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::status_path(root), data.as_bytes())
    }
}
