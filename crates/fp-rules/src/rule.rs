//! Parsed network rules

use fp_core::{FilterRule, Request, RuleMatchError};

use crate::pattern::{AnchorType, Pattern};
use crate::types::{RuleFlags, SchemeMask};
use crate::url::{extract_host, extract_scheme, host_matches_domain};

/// `$domain=` constraint on the request host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainConstraint {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl DomainConstraint {
    fn allows(&self, host: &str) -> bool {
        if self.exclude.iter().any(|d| host_matches_domain(host, d)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|d| host_matches_domain(host, d))
    }
}

/// `$header=` constraint on request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSpec {
    pub name: String,
    /// Substring the header value must contain; `None` checks presence only
    pub value: Option<String>,
    pub negate: bool,
}

impl HeaderSpec {
    fn matches(&self, request: &Request<'_>) -> bool {
        let mut found = false;
        let mut any_value_match = false;

        for value in request.header_values(&self.name) {
            found = true;
            if let Some(expected) = &self.value {
                if find_case_insensitive(value.as_bytes(), expected.as_bytes()).is_some() {
                    any_value_match = true;
                }
            }
        }

        let matched = match self.value {
            None => found,
            Some(_) => any_value_match,
        };
        matched != self.negate
    }
}

/// What a rule tests the request against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    /// Request host equals the domain or is a subdomain of it
    Host(String),
    /// URL pattern
    Pattern(Pattern),
}

/// One parsed network rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRule {
    pub(crate) flags: RuleFlags,
    pub(crate) target: RuleTarget,
    pub(crate) scheme_mask: SchemeMask,
    pub(crate) domains: Option<DomainConstraint>,
    pub(crate) headers: Vec<HeaderSpec>,
}

impl NetworkRule {
    pub fn flags(&self) -> RuleFlags {
        self.flags
    }

    /// Whether the rule was written as an `@@` exception.
    pub fn is_exception(&self) -> bool {
        self.flags.contains(RuleFlags::EXCEPTION)
    }

    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    pub fn domains(&self) -> Option<&DomainConstraint> {
        self.domains.as_ref()
    }

    pub fn headers(&self) -> &[HeaderSpec] {
        &self.headers
    }

    fn needs_host(&self) -> bool {
        self.domains.is_some()
            || match &self.target {
                RuleTarget::Host(_) => true,
                RuleTarget::Pattern(pattern) => pattern.anchor() == AnchorType::Hostname,
            }
    }
}

impl FilterRule for NetworkRule {
    fn matches(&self, request: &Request<'_>) -> Result<bool, RuleMatchError> {
        if !self.scheme_mask.allows(extract_scheme(request.url)) {
            return Ok(false);
        }

        let host = request_host(request);
        if host.is_none() && self.needs_host() {
            return Err(RuleMatchError::MissingHost(request.url.to_string()));
        }

        if let (Some(domains), Some(host)) = (&self.domains, host) {
            if !domains.allows(host) {
                return Ok(false);
            }
        }

        if !self.headers.iter().all(|spec| spec.matches(request)) {
            return Ok(false);
        }

        let matched = match &self.target {
            RuleTarget::Host(domain) => host.map_or(false, |host| host_matches_domain(host, domain)),
            RuleTarget::Pattern(pattern) => pattern.matches(request.url),
        };
        Ok(matched)
    }
}

/// Request host, falling back to the host part of the URL.
fn request_host<'a>(request: &Request<'a>) -> Option<&'a str> {
    let host = request.host.trim();
    if !host.is_empty() {
        return Some(host);
    }
    extract_host(request.url)
}

fn find_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }

    let last = haystack.len() - needle.len();
    (0..=last).find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}
