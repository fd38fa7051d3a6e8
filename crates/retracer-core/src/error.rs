use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetracerError {
    #[error("architecture list cannot be empty")]
    EmptyArchitectures,

    #[error("invalid architecture '{0}': must be lowercase alphanumeric")]
    InvalidArchitecture(String),

    #[error("secret '{0}' not found")]
    SecretNotFound(String),

    #[error("secret '{0}' not readable: access not granted")]
    SecretNotGranted(String),

    #[error("secret '{id}' has no '{key}' key")]
    SecretKeyMissing { id: String, key: String },

    #[error("package manager failed: {0}")]
    PackageManager(String),

    #[error("{action} {unit} failed: {detail}")]
    ServiceManager {
        unit: String,
        action: &'static str,
        detail: String,
    },

    #[error("git {action} failed: {detail}")]
    Git {
        action: &'static str,
        detail: String,
    },

    #[error("download of {url} failed: {detail}")]
    Download { url: String, detail: String },

    #[error("required binary not found: {0}")]
    BinaryNotFound(String),

    #[error("chown {path} to {owner} failed: {detail}")]
    Chown {
        path: String,
        owner: String,
        detail: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RetracerError>;
