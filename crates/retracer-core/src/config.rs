use crate::error::{Result, RetracerError};
use crate::paths;

// ---------------------------------------------------------------------------
// Architectures
// ---------------------------------------------------------------------------

/// Parse the whitespace-separated architecture list from configuration.
///
/// Order is preserved, duplicates collapse to the first occurrence, and each
/// token is validated. An empty result is a validation error so callers can
/// refuse to touch the host before any side effect.
pub fn parse_architectures(raw: &str) -> Result<Vec<String>> {
    let mut archs: Vec<String> = Vec::new();
    for token in raw.split_whitespace() {
        paths::validate_arch(token)?;
        if !archs.iter().any(|a| a == token) {
            archs.push(token.to_string());
        }
    }
    if archs.is_empty() {
        return Err(RetracerError::EmptyArchitectures);
    }
    Ok(archs)
}

// ---------------------------------------------------------------------------
// Outbound proxies
// ---------------------------------------------------------------------------

/// Outbound proxy URLs for the host, if any. Feeds both subprocess
/// environments (git) and the Environment= block appended to service units.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl ProxyConfig {
    pub fn new(http: Option<String>, https: Option<String>) -> Self {
        Self { http, https }
    }

    fn entries(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(url) = self.http.as_deref() {
            out.push(("http", url));
        }
        if let Some(url) = self.https.as_deref() {
            out.push(("https", url));
        }
        out
    }

    /// Environment variables to inject into child processes.
    pub fn proxy_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        for (proto, url) in self.entries() {
            env.push((format!("{proto}_proxy"), url.to_string()));
            env.push((format!("{}_PROXY", proto.to_uppercase()), url.to_string()));
        }
        env
    }

    /// Render the `Environment=` block appended to service unit bodies.
    /// Each configured protocol yields a lower-case and an upper-case line;
    /// no configured proxies yields an empty string.
    pub fn systemd_environment_block(&self) -> String {
        let mut block = String::new();
        for (proto, url) in self.entries() {
            block.push_str(&format!("\nEnvironment={proto}_proxy={url}"));
            block.push_str(&format!(
                "\nEnvironment={}_PROXY={url}",
                proto.to_uppercase()
            ));
        }
        block
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
