//! Lifecycle controller for a Launchpad retracer host.
//!
//! Provisions packages, directories, and per-architecture systemd worker
//! units, reconciles the enabled unit set against the configured
//! architecture list, and manages the credential blob and reverse-proxy
//! site. OS collaborators (init system, package manager, git, HTTP) sit
//! behind narrow traits so the sequences are testable without a host.

pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod io;
pub mod lifecycle;
pub mod paths;
pub mod pkg;
pub mod reconciler;
pub mod secrets;
pub mod status;
pub mod systemd;
pub mod units;

pub use config::{parse_architectures, ProxyConfig};
pub use error::{Result, RetracerError};
pub use io::Account;
pub use lifecycle::Retracer;
pub use reconciler::{ReconcileReport, Reconciler, UnitState};
pub use status::{Status, StatusRecord};
