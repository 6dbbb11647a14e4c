//! Kubernetes object-name rules.

use std::sync::LazyLock;

use regex::Regex;

const DNS1123_LABEL: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;

static DNS1123_SUBDOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DNS1123_LABEL}(\\.{DNS1123_LABEL})*$")).expect("Invalid regex constant")
});

/// True when `name` is a valid DNS-1123 subdomain, the rule for most object names.
pub fn is_dns1123_subdomain(name: &str) -> bool {
    name.len() <= DNS1123_SUBDOMAIN_MAX_LENGTH && DNS1123_SUBDOMAIN_RE.is_match(name)
}
