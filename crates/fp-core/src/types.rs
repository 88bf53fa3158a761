//! Core type definitions for filterpolicy
//!
//! These types are shared by the registry, the sharded matcher, the trigger
//! trie and the facade.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

// =============================================================================
// Category Identifiers
// =============================================================================

/// Stable, 1-based category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryId(pub u32);

impl CategoryId {
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// List Types
// =============================================================================

/// Kind of filter list a category was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ListType {
    Blacklist,
    Whitelist,
    BypassList,
    TextTrigger,
}

impl ListType {
    /// Parse the configuration tag for a list type.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Blacklist" => Some(Self::Blacklist),
            "Whitelist" => Some(Self::Whitelist),
            "BypassList" => Some(Self::BypassList),
            "TextTrigger" => Some(Self::TextTrigger),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Blacklist => "Blacklist",
            Self::Whitelist => "Whitelist",
            Self::BypassList => "BypassList",
            Self::TextTrigger => "TextTrigger",
        }
    }

    /// Rule groups for bypass lists live in the bypass group list.
    #[inline]
    pub fn is_bypass(self) -> bool {
        self == Self::BypassList
    }

    /// Whether lines of this list are rules (as opposed to trigger phrases).
    #[inline]
    pub fn holds_rules(self) -> bool {
        self != Self::TextTrigger
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

// =============================================================================
// Categories
// =============================================================================

/// A named category registered for one configuration generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub list_type: ListType,
    pub name: String,
}

/// Category descriptor reported by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MatchedCategory {
    pub id: CategoryId,
    pub list_type: ListType,
}

impl From<&Category> for MatchedCategory {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            list_type: category.list_type,
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Header name to ordered header values.
pub type HeaderMap = HashMap<String, Vec<String>>;

/// A request being matched against rule shards.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Full request URL
    pub url: &'a str,
    /// Request hostname (domain)
    pub host: &'a str,
    /// Request headers, if any were supplied
    pub headers: Option<&'a HeaderMap>,
}

impl<'a> Request<'a> {
    pub fn new(url: &'a str, host: &'a str) -> Self {
        Self {
            url,
            host,
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: &'a HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Values of a header, looked up case-insensitively by name.
    pub fn header_values<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'a str> + 's {
        self.headers
            .into_iter()
            .flat_map(|map| map.iter())
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_type_tags() {
        for list_type in [
            ListType::Blacklist,
            ListType::Whitelist,
            ListType::BypassList,
            ListType::TextTrigger,
        ] {
            assert_eq!(ListType::from_tag(list_type.as_tag()), Some(list_type));
        }
        assert_eq!(ListType::from_tag("blacklist"), None);
        assert!(ListType::BypassList.is_bypass());
        assert!(!ListType::TextTrigger.holds_rules());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type".to_string(), vec!["text/html".to_string()]);
        headers.insert("X-Extra".to_string(), vec!["a".to_string(), "b".to_string()]);

        let req = Request::new("https://example.com/", "example.com").with_headers(&headers);
        assert_eq!(req.header_values("content-type").collect::<Vec<_>>(), vec!["text/html"]);
        assert_eq!(req.header_values("x-extra").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(req.header_values("missing").count(), 0);

        let bare = Request::new("https://example.com/", "example.com");
        assert_eq!(bare.header_values("content-type").count(), 0);
    }
}
