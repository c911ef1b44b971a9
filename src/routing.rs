//! Egress interface selection per destination host.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::classify::DomainClassifier;

/// Which rule picked the egress interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// IP literal or unclassified domain
    Default,
    /// Company domain with a company interface configured
    Company,
    /// Blocklisted domain
    Blocklist,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Default => write!(f, "default"),
            Route::Company => write!(f, "company"),
            Route::Blocklist => write!(f, "blocklist"),
        }
    }
}

/// The three logical egress interfaces. Empty means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceNames {
    pub default: String,
    pub blocklist: String,
    pub company: String,
}

/// Picks the egress interface for a destination.
#[derive(Debug, Clone)]
pub struct Router {
    classifier: Arc<DomainClassifier>,
    interfaces: InterfaceNames,
}

impl Router {
    /// Create a router over a shared classifier.
    pub fn new(classifier: Arc<DomainClassifier>, interfaces: InterfaceNames) -> Self {
        Self {
            classifier,
            interfaces,
        }
    }

    /// Classify `host`.
    ///
    /// IP literals are never classified. Company domains win over the
    /// blocklist, but only when a company interface is configured.
    pub fn route(&self, host: &str) -> Route {
        if host.parse::<IpAddr>().is_ok() {
            return Route::Default;
        }
        if !self.interfaces.company.is_empty() && self.classifier.is_company_domain(host) {
            return Route::Company;
        }
        if self.classifier.is_blocklisted(host) {
            return Route::Blocklist;
        }
        Route::Default
    }

    /// Interface name for `host`; empty means dial without binding.
    pub fn select_interface(&self, host: &str) -> &str {
        self.interface_for(self.route(host))
    }

    /// Interface name configured for `route`.
    pub fn interface_for(&self, route: Route) -> &str {
        match route {
            Route::Default => &self.interfaces.default,
            Route::Company => &self.interfaces.company,
            Route::Blocklist => &self.interfaces.blocklist,
        }
    }

    /// The configured interface names.
    pub fn interfaces(&self) -> &InterfaceNames {
        &self.interfaces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> InterfaceNames {
        InterfaceNames {
            default: "en0".into(),
            blocklist: "utun4".into(),
            company: "utun7".into(),
        }
    }

    fn router(interfaces: InterfaceNames) -> Router {
        let classifier = Arc::new(DomainClassifier::new());
        classifier.replace_blocklist(
            ["example.com", "shared.org", "8.8.8.8"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
        );
        classifier.set_domain_lists(["corp.example", "shared.org", "8.8.8.8"], Vec::<String>::new());
        Router::new(classifier, interfaces)
    }

    #[test]
    fn test_ip_literals_use_default() {
        let router = router(names());
        assert_eq!(router.select_interface("8.8.8.8"), "en0");
        assert_eq!(router.select_interface("::1"), "en0");
        assert_eq!(router.route("8.8.8.8"), Route::Default);
    }

    #[test]
    fn test_classified_domains() {
        let router = router(names());
        assert_eq!(router.select_interface("www.example.com"), "utun4");
        assert_eq!(router.select_interface("git.corp.example"), "utun7");
        assert_eq!(router.select_interface("rust-lang.org"), "en0");
    }

    #[test]
    fn test_company_wins_over_blocklist() {
        let router = router(names());
        assert_eq!(router.route("cdn.shared.org"), Route::Company);
        assert_eq!(router.select_interface("cdn.shared.org"), "utun7");
    }

    #[test]
    fn test_unset_company_interface_falls_through() {
        let mut interfaces = names();
        interfaces.company.clear();
        let router = router(interfaces);

        assert_eq!(router.route("cdn.shared.org"), Route::Blocklist);
        assert_eq!(router.route("git.corp.example"), Route::Default);
        assert_eq!(router.select_interface("git.corp.example"), "en0");
    }

    #[test]
    fn test_unset_blocklist_interface_is_unbound() {
        let mut interfaces = names();
        interfaces.blocklist.clear();
        let router = router(interfaces);

        assert_eq!(router.route("example.com"), Route::Blocklist);
        assert_eq!(router.select_interface("example.com"), "");
    }
}
