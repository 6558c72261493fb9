//! Address → (strategy, policy, proxy) routing.
//!
//! Routing is a pure lookup over three curated domain tables plus the
//! [`PolicyRegistry`]. Table entries match the domain exactly or as a
//! dot-separated suffix, so `m.reddit.com` matches `reddit.com`.

use std::sync::Arc;

use crate::core::domain_of;
use crate::fetch::StrategyKind;
use crate::policy::{ContentPolicy, PolicyRegistry};

/// Domains whose content only appears after script execution.
pub const RENDER_REQUIRED: &[&str] = &[
    "zhihu.com",
    "xiaohongshu.com",
    "weibo.com",
    "reddit.com",
    "bloomberg.com",
    "investing.com",
    "jin10.com",
    "news.ycombinator.com",
    "github.com",
];

/// Domains known to serve complete static markup.
pub const STATIC_SAFE: &[&str] = &[
    "raw.githubusercontent.com",
    "arxiv.org",
    "docs.python.org",
    "en.wikipedia.org",
    "docs.rs",
];

/// Domains that must be reached without the configured proxy.
pub const DIRECT_CONNECT: &[&str] = &["wikipedia.org", "reddit.com"];

/// Routing decision for one address.
#[derive(Debug, Clone)]
pub struct Route {
    /// Normalized domain.
    pub domain: String,
    /// Selected strategy family.
    pub strategy: StrategyKind,
    /// Policy to apply around the fetch.
    pub policy: Arc<ContentPolicy>,
    /// Whether the proxy must be cleared.
    pub bypass_proxy: bool,
}

/// Maps addresses to routes.
#[derive(Debug, Clone)]
pub struct Router {
    registry: PolicyRegistry,
    static_available: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(PolicyRegistry::builtin())
    }
}

impl Router {
    /// Creates a router over `registry`, with a static strategy available.
    #[must_use]
    pub fn new(registry: PolicyRegistry) -> Self {
        Self {
            registry,
            static_available: true,
        }
    }

    /// Declares whether a static strategy is configured.
    #[must_use]
    pub fn with_static_available(mut self, available: bool) -> Self {
        self.static_available = available;
        self
    }

    /// Whether static routing can be selected at all.
    #[must_use]
    pub fn static_available(&self) -> bool {
        self.static_available
    }

    /// The policy registry.
    #[must_use]
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Registers (or replaces) the policy for one domain.
    pub fn register(&mut self, domain: impl Into<String>, policy: Arc<ContentPolicy>) {
        self.registry.register(domain, policy);
    }

    /// Routes `url`.
    #[must_use]
    pub fn route(&self, url: &str) -> Route {
        let domain = domain_of(url);
        let host = strip_port(&domain);

        let policy = self.registry.lookup(host);
        let strategy = if matches_any(host, RENDER_REQUIRED) {
            StrategyKind::Render
        } else if self.static_available && matches_any(host, STATIC_SAFE) {
            StrategyKind::Static
        } else {
            StrategyKind::Render
        };
        let bypass_proxy = matches_any(host, DIRECT_CONNECT);

        Route {
            domain,
            strategy,
            policy,
            bypass_proxy,
        }
    }
}

/// Exact or dot-suffix match against a domain table.
#[must_use]
pub fn matches_any(host: &str, table: &[&str]) -> bool {
    table.iter().any(|entry| {
        host == *entry
            || host
                .strip_suffix(entry)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn strip_port(domain: &str) -> &str {
    match domain.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::default()
    }

    #[test]
    fn test_static_domain_uses_static_strategy() {
        let route = router().route("https://docs.python.org/3/library/re.html");
        assert_eq!(route.strategy, StrategyKind::Static);
        assert_eq!(route.domain, "docs.python.org");
    }

    #[test]
    fn test_static_requires_static_strategy() {
        let route = router()
            .with_static_available(false)
            .route("https://docs.python.org/3/");
        assert_eq!(route.strategy, StrategyKind::Render);
    }

    #[test]
    fn test_render_required_wins() {
        let r = router();
        assert_eq!(r.route("https://news.ycombinator.com/").strategy, StrategyKind::Render);
        assert_eq!(r.route("https://github.com/rust-lang/rust").strategy, StrategyKind::Render);
        assert_eq!(r.route("https://www.zhihu.com/question/1").strategy, StrategyKind::Render);
    }

    #[test]
    fn test_unknown_domain_defaults_to_render_and_noop_policy() {
        let route = router().route("https://some-blog.example/post");
        assert_eq!(route.strategy, StrategyKind::Render);
        assert_eq!(route.policy.name, "default");
        assert!(!route.bypass_proxy);
    }

    #[test]
    fn test_subdomain_policy_fallback() {
        let route = router().route("https://de.wikipedia.org/wiki/Rust");
        assert_eq!(route.policy.name, "wikipedia");
        assert_eq!(route.strategy, StrategyKind::Render);
        assert!(route.bypass_proxy);
    }

    #[test]
    fn test_suffix_static_match() {
        let route = router().route("https://export.arxiv.org/abs/1234");
        assert_eq!(route.strategy, StrategyKind::Static);
    }

    #[test]
    fn test_suffix_requires_label_boundary() {
        assert!(matches_any("m.reddit.com", &["reddit.com"]));
        assert!(!matches_any("notreddit.com", &["reddit.com"]));
    }

    #[test]
    fn test_direct_connect() {
        assert!(router().route("https://old.reddit.com/r/rust").bypass_proxy);
        assert!(router().route("https://en.wikipedia.org/wiki/Rust").bypass_proxy);
    }

    #[test]
    fn test_port_is_ignored_for_matching() {
        let route = router().route("https://docs.python.org:443/3/");
        assert_eq!(route.strategy, StrategyKind::Static);
        let route = router().route("http://docs.python.org:8000/3/");
        assert_eq!(route.domain, "docs.python.org:8000");
        assert_eq!(route.strategy, StrategyKind::Static);
    }

    #[test]
    fn test_register_custom_policy() {
        let mut r = router();
        r.register("intranet.local", Arc::new(ContentPolicy::new("intranet")));
        assert_eq!(r.route("http://intranet.local/").policy.name, "intranet");
    }
}
