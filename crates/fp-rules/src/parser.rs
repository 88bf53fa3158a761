use std::net::IpAddr;

use fp_core::{RuleParseError, RuleParser};

use crate::pattern::{AnchorType, Pattern};
use crate::rule::{DomainConstraint, HeaderSpec, NetworkRule, RuleTarget};
use crate::types::{RuleFlags, SchemeMask};

/// Parser for adblock-style network rules.
///
/// Supported: `||` host anchors, `|` left/right anchors, `*` and `^`,
/// `@@` exceptions, hosts-file lines, and the options `match-case`,
/// `important`, `domain=`, `header=` and scheme options (`http`, `~https`, …).
/// Cosmetic rules, regex rules and request-type options are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbpRuleParser;

impl AbpRuleParser {
    pub fn new() -> Self {
        Self
    }
}

impl RuleParser for AbpRuleParser {
    type Rule = NetworkRule;

    fn parse_rule(&self, line: &str) -> Result<NetworkRule, RuleParseError> {
        parse_rule(line)
    }
}

/// Parse one rule line.
pub fn parse_rule(raw_line: &str) -> Result<NetworkRule, RuleParseError> {
    let mut line = raw_line.trim();
    if line.is_empty() {
        return Err(RuleParseError::Empty);
    }
    if is_comment_line(line) {
        return Err(RuleParseError::Comment);
    }
    if line.contains("##") || line.contains("#@#") || line.contains("#?#") {
        return Err(RuleParseError::Unsupported(format!("cosmetic rule: {line}")));
    }

    let mut flags = RuleFlags::empty();
    if let Some(rest) = line.strip_prefix("@@") {
        flags |= RuleFlags::EXCEPTION;
        line = rest.trim_start();
    }

    let (pattern_part, options_text) = split_rule_options(line);
    let options = match options_text {
        Some(options_text) => parse_options(options_text)?,
        None => ParsedOptions::default(),
    };
    flags |= options.flags;

    let pattern_str = pattern_part.trim();

    let target = if let Some(domain) = parse_host_anchor_rule(pattern_str) {
        flags |= RuleFlags::HAS_HOST_ANCHOR;
        RuleTarget::Host(domain)
    } else if let Some(domain) = parse_hosts_file_domain(pattern_str) {
        RuleTarget::Host(domain)
    } else {
        let parsed = parse_pattern_rule(pattern_str)?;
        flags |= parsed.flags;
        RuleTarget::Pattern(Pattern::compile(
            &parsed.pattern,
            parsed.anchor_type,
            parsed.flags.contains(RuleFlags::HAS_RIGHT_ANCHOR),
            flags.contains(RuleFlags::MATCH_CASE),
        ))
    };

    Ok(NetworkRule {
        flags,
        target,
        scheme_mask: options.scheme_mask,
        domains: options.domains,
        headers: options.headers,
    })
}

// =============================================================================
// Options
// =============================================================================

#[derive(Default)]
struct ParsedOptions {
    flags: RuleFlags,
    scheme_mask: SchemeMask,
    domains: Option<DomainConstraint>,
    headers: Vec<HeaderSpec>,
}

fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.rfind('$') {
        Some(pos) => (&line[..pos], Some(&line[pos + 1..])),
        None => (line, None),
    }
}

fn parse_options(text: &str) -> Result<ParsedOptions, RuleParseError> {
    let mut options = ParsedOptions::default();
    let mut scheme_include = SchemeMask::empty();
    let mut scheme_exclude = SchemeMask::empty();

    for raw in text.trim().split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        // $important is accepted and has no effect on category matching.
        if raw_lower == "important" {
            continue;
        }

        if raw_lower == "match-case" || raw_lower == "match_case" {
            options.flags |= RuleFlags::MATCH_CASE;
            continue;
        }

        if let Some(domain_value) = raw_lower.strip_prefix("domain=") {
            let parsed = parse_domain_option(domain_value)
                .ok_or_else(|| RuleParseError::InvalidOption(raw.to_string()))?;
            options.domains = Some(merge_constraints(options.domains.take(), parsed));
            continue;
        }

        if raw_lower.starts_with("header=") {
            // Name and value keep their case.
            let spec = parse_header_option(&raw["header=".len()..])
                .ok_or_else(|| RuleParseError::InvalidOption(raw.to_string()))?;
            options.headers.push(spec);
            continue;
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };

        if let Some(mask) = SchemeMask::from_option(name) {
            if negated {
                scheme_exclude |= mask;
            } else {
                scheme_include |= mask;
            }
            continue;
        }

        return Err(RuleParseError::InvalidOption(raw.to_string()));
    }

    options.scheme_mask = finalize_scheme_mask(scheme_include, scheme_exclude)
        .ok_or_else(|| RuleParseError::InvalidOption(text.to_string()))?;
    Ok(options)
}

fn merge_constraints(existing: Option<DomainConstraint>, incoming: DomainConstraint) -> DomainConstraint {
    match existing {
        Some(mut current) => {
            current.include.extend(incoming.include);
            current.exclude.extend(incoming.exclude);
            current
        }
        None => incoming,
    }
}

fn parse_domain_option(value: &str) -> Option<DomainConstraint> {
    let mut constraint = DomainConstraint::default();

    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let domain = normalize_domain(domain_raw)?;
        if is_exclude {
            constraint.exclude.push(domain);
        } else {
            constraint.include.push(domain);
        }
    }

    if constraint.include.is_empty() && constraint.exclude.is_empty() {
        return None;
    }

    Some(constraint)
}

/// `header=name`, `header=name:value` or `header=~name[:value]`.
fn parse_header_option(value: &str) -> Option<HeaderSpec> {
    let (negate, value) = match value.strip_prefix('~') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let (name, expected) = match value.split_once(':') {
        Some((name, expected)) => (name.trim(), Some(expected.trim())),
        None => (value.trim(), None),
    };
    if name.is_empty() || expected.map_or(false, str::is_empty) {
        return None;
    }

    Some(HeaderSpec {
        name: name.to_string(),
        value: expected.map(str::to_string),
        negate,
    })
}

/// Empty result means every scheme is allowed.
fn finalize_scheme_mask(include: SchemeMask, exclude: SchemeMask) -> Option<SchemeMask> {
    let mask = if include.is_empty() {
        SchemeMask::ALL - exclude
    } else {
        include - exclude
    };
    if mask.is_empty() {
        return None;
    }
    if mask == SchemeMask::ALL {
        return Some(SchemeMask::empty());
    }
    Some(mask)
}

// =============================================================================
// Patterns
// =============================================================================

fn is_comment_line(line: &str) -> bool {
    line.starts_with('!') || line.starts_with('[') || line.starts_with('#')
}

/// `||domain^` style rule with nothing but a host.
fn parse_host_anchor_rule(line: &str) -> Option<String> {
    let rest = line.strip_prefix("||")?;
    let rest = rest.strip_prefix('.').unwrap_or(rest);

    let mut end = rest.len();
    for (i, ch) in rest.char_indices() {
        if ch == '^' || ch == '|' {
            end = i;
            break;
        }
        if ch == '/' || ch == '?' || ch == '#' || ch == ':' || ch == '*' {
            return None;
        }
    }

    // Only a trailing `^` or `^|` may follow the host.
    if !matches!(&rest[end..], "" | "^" | "^|" | "|") {
        return None;
    }

    normalize_domain(&rest[..end])
}

fn parse_hosts_file_domain(line: &str) -> Option<String> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    let second = parts.next()?;

    if first.parse::<IpAddr>().is_ok() {
        return normalize_domain(second);
    }

    None
}

fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
    {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}

struct ParsedPattern {
    pattern: String,
    anchor_type: AnchorType,
    flags: RuleFlags,
}

fn parse_pattern_rule(line: &str) -> Result<ParsedPattern, RuleParseError> {
    if line.is_empty() {
        return Err(RuleParseError::InvalidPattern("empty pattern".to_string()));
    }

    if line.len() > 2 && line.starts_with('/') && line.ends_with('/') {
        return Err(RuleParseError::Unsupported(format!("regex rule: {line}")));
    }

    let mut flags = RuleFlags::empty();
    let (anchor_type, rest) = if let Some(rest) = line.strip_prefix("||") {
        flags |= RuleFlags::HAS_HOST_ANCHOR;
        (AnchorType::Hostname, rest)
    } else if let Some(rest) = line.strip_prefix('|') {
        flags |= RuleFlags::HAS_LEFT_ANCHOR;
        (AnchorType::Left, rest)
    } else {
        (AnchorType::None, line)
    };

    let rest = match rest.strip_suffix('|') {
        Some(stripped) => {
            flags |= RuleFlags::HAS_RIGHT_ANCHOR;
            stripped
        }
        None => rest,
    };

    if rest.is_empty() || rest.chars().all(|c| c == '*') {
        return Err(RuleParseError::InvalidPattern(line.to_string()));
    }
    if rest.contains(char::is_whitespace) {
        return Err(RuleParseError::InvalidPattern(line.to_string()));
    }

    Ok(ParsedPattern {
        pattern: rest.to_string(),
        anchor_type,
        flags,
    })
}
