//! URL helpers for rule matching
//!
//! These functions avoid allocations and work directly on string slices.

use crate::types::SchemeMask;

// =============================================================================
// Scheme Extraction
// =============================================================================

/// Scheme of a URL, or None if unknown.
#[inline]
pub fn extract_scheme(url: &str) -> Option<SchemeMask> {
    let bytes = url.as_bytes();
    let starts_with = |prefix: &[u8]| bytes.len() >= prefix.len() && bytes[..prefix.len()].eq_ignore_ascii_case(prefix);

    if starts_with(b"https://") {
        Some(SchemeMask::HTTPS)
    } else if starts_with(b"http://") {
        Some(SchemeMask::HTTP)
    } else if starts_with(b"wss://") {
        Some(SchemeMask::WSS)
    } else if starts_with(b"ws://") {
        Some(SchemeMask::WS)
    } else if starts_with(b"data:") {
        Some(SchemeMask::DATA)
    } else if starts_with(b"ftp://") {
        Some(SchemeMask::FTP)
    } else {
        None
    }
}

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Byte range of the host in a URL, skipping userinfo and port.
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' {
            break;
        }
    }

    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Host slice of a URL. Empty hosts are reported as None.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    if host_start >= host_end {
        return None;
    }
    Some(&url[host_start..host_end])
}

/// Check whether `host` is `domain` or one of its subdomains.
#[inline]
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').as_bytes();
    let domain = domain.as_bytes();
    if domain.is_empty() || host.len() < domain.len() {
        return false;
    }

    let split = host.len() - domain.len();
    host[split..].eq_ignore_ascii_case(domain) && (split == 0 || host[split - 1] == b'.')
}

// =============================================================================
// ABP Boundary Check
// =============================================================================

/// ABP `^` matches the end of the URL or any byte that is not
/// alphanumeric and not one of `_ - . %`.
#[inline]
pub fn is_boundary_char(c: u8) -> bool {
    !(c.is_ascii_alphanumeric() || matches!(c, b'_' | b'-' | b'.' | b'%'))
}

/// Check if position in string is at a boundary.
#[inline]
pub fn is_at_boundary(s: &[u8], pos: usize) -> bool {
    pos >= s.len() || is_boundary_char(s[pos])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_scheme() {
        assert_eq!(extract_scheme("https://example.com"), Some(SchemeMask::HTTPS));
        assert_eq!(extract_scheme("HTTP://example.com"), Some(SchemeMask::HTTP));
        assert_eq!(extract_scheme("wss://example.com"), Some(SchemeMask::WSS));
        assert_eq!(extract_scheme("ws://example.com"), Some(SchemeMask::WS));
        assert_eq!(extract_scheme("data:text/html"), Some(SchemeMask::DATA));
        assert_eq!(extract_scheme("ftp://example.com"), Some(SchemeMask::FTP));
        assert_eq!(extract_scheme("invalid"), None);
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://example.com/path"), Some("example.com"));
        assert_eq!(extract_host("https://user:pw@example.com:8080/x"), Some("example.com"));
        assert_eq!(extract_host("http://example.com?q=1"), Some("example.com"));
        assert_eq!(extract_host("http://example.com"), Some("example.com"));
        assert_eq!(extract_host("example.com/path"), None);
        assert_eq!(extract_host("http:///path"), None);
    }

    #[test]
    fn test_host_matches_domain() {
        assert!(host_matches_domain("example.com", "example.com"));
        assert!(host_matches_domain("ads.Example.com", "example.com"));
        assert!(host_matches_domain("example.com.", "example.com"));
        assert!(!host_matches_domain("badexample.com", "example.com"));
        assert!(!host_matches_domain("example.com", "ads.example.com"));
        assert!(!host_matches_domain("example.com", ""));
    }

    #[test]
    fn test_boundary() {
        for c in [b'/', b'?', b'&', b'=', b':'] {
            assert!(is_boundary_char(c));
        }
        for c in [b'a', b'Z', b'0', b'%', b'.', b'-', b'_'] {
            assert!(!is_boundary_char(c));
        }
        assert!(is_at_boundary(b"abc", 3));
        assert!(!is_at_boundary(b"abc", 1));
    }
}
