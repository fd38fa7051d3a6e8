//! Embedded unit files and site configuration.
//!
//! The bodies are static; rendering only appends the proxy `Environment=`
//! block to the two service units. Timers are written verbatim.

use crate::config::ProxyConfig;

pub const DUPCHECK_SERVICE_BODY: &str =
    include_str!("../templates/launchpad-retracer-dupcheck.service");
pub const DUPCHECK_TIMER_BODY: &str =
    include_str!("../templates/launchpad-retracer-dupcheck.timer");
pub const WORKER_SERVICE_BODY: &str =
    include_str!("../templates/launchpad-retracer-worker@.service");
pub const WORKER_TIMER_BODY: &str =
    include_str!("../templates/launchpad-retracer-worker@.timer");

pub const NGINX_SITE_BODY: &str = include_str!("../templates/crashdb.conf");
pub const WORKER_WRAPPER_BODY: &str = include_str!("../templates/worker-wrapper");

pub fn render_dupcheck_service(proxies: &ProxyConfig) -> String {
    format!("{DUPCHECK_SERVICE_BODY}{}", proxies.systemd_environment_block())
}

pub fn render_worker_service(proxies: &ProxyConfig) -> String {
    format!("{WORKER_SERVICE_BODY}{}", proxies.systemd_environment_block())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_bodies_carry_proxy_block() {
        let proxies = ProxyConfig::new(Some("http://proxy:3128".into()), None);
        let rendered = render_worker_service(&proxies);
        assert!(rendered.starts_with(WORKER_SERVICE_BODY));
        assert!(rendered.ends_with("Environment=HTTP_PROXY=http://proxy:3128"));
    }

    #[test]
    fn no_proxies_leaves_bodies_untouched() {
        let proxies = ProxyConfig::default();
        assert_eq!(render_dupcheck_service(&proxies), DUPCHECK_SERVICE_BODY);
        assert_eq!(render_worker_service(&proxies), WORKER_SERVICE_BODY);
    }

    #[test]
    fn worker_template_is_instanced() {
        assert!(WORKER_SERVICE_BODY.contains("%i"));
        assert!(WORKER_TIMER_BODY.contains("WantedBy=timers.target"));
    }
}
