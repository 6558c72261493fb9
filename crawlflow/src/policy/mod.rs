//! Site content policies.
//!
//! A policy pairs a configuration override applied before a fetch with a
//! text cleanup applied after it. Policies are plain records: per-site
//! behavior comes from data (selectors, waits, removal patterns, a low-yield
//! threshold), not from overriding methods. They are built once, wrapped in
//! [`Arc`], and never mutated afterwards.

mod catalog;
pub(crate) mod cleanup;

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::{FetchResult, FetchStatus};
use crate::fetch::{FetchRequestConfig, WAIT_FOR_KEY};

pub use cleanup::{apply_removals, collapse_blank_lines};
pub(crate) use cleanup::pattern;

/// Metadata key carrying a human-readable advisory.
pub const HINT_KEY: &str = "hint";

/// Marks content shorter than `min_chars` as partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowYieldRule {
    /// Threshold in characters.
    pub min_chars: usize,
    /// Advisory stored under `metadata["hint"]`.
    pub hint: String,
}

/// Per-site fetch customization and result cleanup.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    /// Policy name.
    pub name: String,
    /// Domains the policy claims.
    pub domains: Vec<String>,
    /// Whether the site only serves content to logged-in sessions.
    pub needs_login: bool,
    /// Selector to wait for before capture.
    pub wait_for: Option<String>,
    /// Forced capture selector.
    pub css_selector: Option<String>,
    /// Script injected before capture.
    pub js_code: Option<String>,
    /// Force auto-scroll.
    pub scroll: bool,
    /// Minimum wait in seconds.
    pub extra_wait: f64,
    removals: Vec<Regex>,
    cleans: bool,
    sync_bodies: bool,
    low_yield: Option<LowYieldRule>,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new("default")
    }
}

impl ContentPolicy {
    /// Creates a policy that changes nothing.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domains: Vec::new(),
            needs_login: false,
            wait_for: None,
            css_selector: None,
            js_code: None,
            scroll: false,
            extra_wait: 0.0,
            removals: Vec::new(),
            cleans: false,
            sync_bodies: false,
            low_yield: None,
        }
    }

    /// Sets the claimed domains.
    #[must_use]
    pub fn with_domains(mut self, domains: &[&str]) -> Self {
        self.domains = domains.iter().map(|d| (*d).to_string()).collect();
        self
    }

    /// Marks the site as login-only.
    #[must_use]
    pub fn requires_login(mut self) -> Self {
        self.needs_login = true;
        self
    }

    /// Sets the wait-for selector.
    #[must_use]
    pub fn with_wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = Some(selector.into());
        self
    }

    /// Forces a capture selector.
    #[must_use]
    pub fn with_css_selector(mut self, selector: impl Into<String>) -> Self {
        self.css_selector = Some(selector.into());
        self
    }

    /// Sets the injected script.
    #[must_use]
    pub fn with_js_code(mut self, js: impl Into<String>) -> Self {
        self.js_code = Some(js.into());
        self
    }

    /// Forces auto-scroll.
    #[must_use]
    pub fn with_scroll(mut self) -> Self {
        self.scroll = true;
        self
    }

    /// Sets the minimum wait.
    #[must_use]
    pub fn with_extra_wait(mut self, seconds: f64) -> Self {
        self.extra_wait = seconds;
        self
    }

    /// Appends a removal pattern. Implies blank-line collapsing.
    #[must_use]
    pub fn with_removal(mut self, re: Regex) -> Self {
        self.removals.push(re);
        self.cleans = true;
        self
    }

    /// Enables blank-line collapsing without any removal pattern.
    #[must_use]
    pub fn with_cleanup(mut self) -> Self {
        self.cleans = true;
        self
    }

    /// Writes cleaned text into both bodies instead of only the one it came from.
    #[must_use]
    pub fn syncing_bodies(mut self) -> Self {
        self.sync_bodies = true;
        self
    }

    /// Sets a low-yield threshold and its hint.
    #[must_use]
    pub fn with_low_yield(mut self, min_chars: usize, hint: impl Into<String>) -> Self {
        self.low_yield = Some(LowYieldRule {
            min_chars,
            hint: hint.into(),
        });
        self
    }

    /// The low-yield rule, if any.
    #[must_use]
    pub fn low_yield(&self) -> Option<&LowYieldRule> {
        self.low_yield.as_ref()
    }

    /// Returns true when `refine` is the identity.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        !self.cleans && self.low_yield.is_none()
    }

    /// Returns a copy of `config` with this policy's overrides applied.
    ///
    /// Selector and script are replaced when the policy sets them; scroll is
    /// only ever switched on; the wait never shrinks.
    #[must_use]
    pub fn customize(&self, config: &FetchRequestConfig) -> FetchRequestConfig {
        let mut out = config.clone();
        if let Some(ref selector) = self.css_selector {
            out.selector = Some(selector.clone());
        }
        if let Some(ref js) = self.js_code {
            out.js_code = Some(js.clone());
        }
        if self.scroll {
            out.scroll = true;
        }
        if self.extra_wait > 0.0 {
            out.wait_seconds = out.wait_seconds.max(self.extra_wait);
        }
        if let Some(ref selector) = self.wait_for {
            out.extra
                .insert(WAIT_FOR_KEY.to_string(), serde_json::json!(selector));
        }
        out
    }

    /// Cleans the preferred body and applies the low-yield rule.
    ///
    /// Failed results are returned untouched.
    #[must_use]
    pub fn refine(&self, mut result: FetchResult) -> FetchResult {
        if self.is_passthrough() || result.is_failed() {
            return result;
        }

        if self.cleans {
            let from_reduced = !result.reduced_body.is_empty();
            let cleaned = collapse_blank_lines(&apply_removals(result.preferred_body(), &self.removals));
            if self.sync_bodies {
                result.raw_body.clone_from(&cleaned);
                result.reduced_body = cleaned;
            } else if from_reduced {
                result.reduced_body = cleaned;
            } else {
                result.raw_body = cleaned;
            }
        }

        if let Some(ref rule) = self.low_yield {
            let chars = result.char_count();
            if chars < rule.min_chars {
                debug!(
                    policy = %self.name,
                    url = %result.url,
                    chars,
                    threshold = rule.min_chars,
                    "Low-yield content marked partial"
                );
                result.status = FetchStatus::Partial;
                result
                    .metadata
                    .insert(HINT_KEY.to_string(), serde_json::json!(rule.hint));
            }
        }
        result
    }
}

/// Domain → policy table, consulted by the router.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<ContentPolicy>>,
    fallback: Arc<ContentPolicy>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyRegistry {
    /// Creates an empty registry whose lookups all yield the no-op policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: HashMap::new(),
            fallback: Arc::new(ContentPolicy::default()),
        }
    }

    /// Creates a registry with every built-in site policy.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for policy in catalog::builtin_policies() {
            registry.register_policy(policy);
        }
        registry
    }

    /// Registers `policy` under one domain, replacing any previous entry.
    pub fn register(&mut self, domain: impl Into<String>, policy: Arc<ContentPolicy>) {
        self.policies.insert(domain.into().to_ascii_lowercase(), policy);
    }

    /// Registers `policy` under every domain it claims.
    pub fn register_policy(&mut self, policy: ContentPolicy) {
        let policy = Arc::new(policy);
        for domain in &policy.domains {
            self.register(domain.clone(), Arc::clone(&policy));
        }
    }

    /// Exact-match lookup.
    #[must_use]
    pub fn get(&self, domain: &str) -> Option<Arc<ContentPolicy>> {
        self.policies.get(domain).cloned()
    }

    /// Exact match, then the last two labels, then the no-op policy.
    #[must_use]
    pub fn lookup(&self, domain: &str) -> Arc<ContentPolicy> {
        if let Some(policy) = self.get(domain) {
            return policy;
        }
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() > 2 {
            let parent = labels[labels.len() - 2..].join(".");
            if let Some(policy) = self.get(&parent) {
                return policy;
            }
        }
        Arc::clone(&self.fallback)
    }

    /// The no-op policy.
    #[must_use]
    pub fn fallback(&self) -> Arc<ContentPolicy> {
        Arc::clone(&self.fallback)
    }

    /// Number of registered domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns true when no domain is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Registered domains, sorted.
    #[must_use]
    pub fn domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.policies.keys().cloned().collect();
        domains.sort();
        domains
    }
}
