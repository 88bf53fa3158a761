//! Policy configuration
//!
//! The policy document is JSON with PascalCase keys. Parsing is lenient in the
//! same places the filtering agent is: list entries missing a key are dropped,
//! unknown list types are kept but skipped at build time, and malformed custom
//! rule arrays read as empty.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::matcher::DEFAULT_SHARD_CAPACITY;
use crate::types::ListType;

/// Update frequency used when the document does not set one.
pub const DEFAULT_UPDATE_FREQUENCY: i64 = 30;
/// Update frequency substituted for non-positive values.
pub const MIN_UPDATE_FREQUENCY: i64 = 5;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Lists
// =============================================================================

/// One configured filter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListConfig {
    /// `None` when the document names a list type this build does not know.
    pub list_type: Option<ListType>,
    pub relative_list_path: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawListConfig {
    list_type: String,
    relative_list_path: String,
}

impl From<RawListConfig> for ListConfig {
    fn from(raw: RawListConfig) -> Self {
        Self {
            list_type: ListType::from_tag(&raw.list_type),
            relative_list_path: raw.relative_list_path,
        }
    }
}

impl ListConfig {
    pub fn new(list_type: ListType, relative_list_path: impl Into<String>) -> Self {
        Self {
            list_type: Some(list_type),
            relative_list_path: relative_list_path.into(),
        }
    }

    /// Category name for this list.
    ///
    /// The directory part of the relative path (through the last `/` or `\`)
    /// followed by the file stem: `/lists/adult.txt` becomes `/lists/adult`.
    /// Paths without a directory separator have no category.
    pub fn category_name(&self) -> Option<String> {
        category_name_for(&self.relative_list_path)
    }

    /// Flattened file name the list is stored under.
    pub fn file_name(&self) -> String {
        list_file_name(&self.relative_list_path)
    }
}

/// Category name for a relative list path. See [`ListConfig::category_name`].
pub fn category_name_for(relative_path: &str) -> Option<String> {
    let split = relative_path.rfind(['/', '\\'])?;
    let (dir, file) = relative_path.split_at(split + 1);

    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    if stem.is_empty() {
        return None;
    }

    Some(format!("{dir}{stem}"))
}

/// File name a list is stored under: every `/` becomes `.`.
pub fn list_file_name(relative_path: &str) -> String {
    relative_path.replace('/', ".")
}

// =============================================================================
// Policy
// =============================================================================

/// Parsed policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawPolicyConfig")]
pub struct PolicyConfig {
    pub configured_lists: Vec<ListConfig>,
    /// Minutes between update checks
    pub update_frequency: i64,
    pub custom_trigger_blacklist: Vec<String>,
    pub custom_whitelist: Vec<String>,
    pub self_moderation: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            configured_lists: Vec::new(),
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
            custom_trigger_blacklist: Vec::new(),
            custom_whitelist: Vec::new(),
            self_moderation: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPolicyConfig {
    configured_lists: Vec<Value>,
    #[serde(default)]
    update_frequency: Value,
    #[serde(default)]
    custom_trigger_blacklist: Value,
    #[serde(default)]
    custom_whitelist: Value,
    #[serde(default)]
    self_moderation: Value,
}

impl From<RawPolicyConfig> for PolicyConfig {
    fn from(raw: RawPolicyConfig) -> Self {
        let configured_lists = raw
            .configured_lists
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<RawListConfig>(entry).ok())
            .map(ListConfig::from)
            .collect();

        let update_frequency = match raw.update_frequency.as_i64() {
            Some(freq) if freq <= 0 => MIN_UPDATE_FREQUENCY,
            Some(freq) => freq,
            None => DEFAULT_UPDATE_FREQUENCY,
        };

        Self {
            configured_lists,
            update_frequency,
            custom_trigger_blacklist: string_entries(raw.custom_trigger_blacklist),
            custom_whitelist: string_entries(raw.custom_whitelist),
            self_moderation: string_entries(raw.self_moderation),
        }
    }
}

/// Non-null strings of a JSON array. Anything that is not an array of
/// strings and nulls reads as empty.
fn string_entries(value: Value) -> Vec<String> {
    match serde_json::from_value::<Vec<Option<String>>>(value) {
        Ok(entries) => entries.into_iter().flatten().collect(),
        Err(_) => Vec::new(),
    }
}

impl PolicyConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

// =============================================================================
// Build Options
// =============================================================================

/// Options for building a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Rules per matcher shard
    pub shard_capacity: usize,
    /// Abort the build when more rules than this fail to parse
    pub max_failed_rules: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            shard_capacity: DEFAULT_SHARD_CAPACITY,
            max_failed_rules: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let config = PolicyConfig::from_json_str(
            r#"{
                "ConfiguredLists": [
                    {"ListType": "Blacklist", "RelativeListPath": "/adult/domains.txt"},
                    {"ListType": "TextTrigger", "RelativeListPath": "/adult/triggers.txt"}
                ],
                "UpdateFrequency": 15,
                "CustomTriggerBlacklist": ["bad words", null],
                "CustomWhitelist": ["||example.org^"],
                "SelfModeration": []
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.configured_lists,
            vec![
                ListConfig::new(ListType::Blacklist, "/adult/domains.txt"),
                ListConfig::new(ListType::TextTrigger, "/adult/triggers.txt"),
            ]
        );
        assert_eq!(config.update_frequency, 15);
        assert_eq!(config.custom_trigger_blacklist, vec!["bad words"]);
        assert_eq!(config.custom_whitelist, vec!["||example.org^"]);
        assert!(config.self_moderation.is_empty());
    }

    #[test]
    fn drops_incomplete_list_entries() {
        let config = PolicyConfig::from_json_str(
            r#"{"ConfiguredLists": [
                {"ListType": "Blacklist"},
                null,
                {"ListType": "Sometimes", "RelativeListPath": "/x/y.txt"},
                {"ListType": "Whitelist", "RelativeListPath": "/x/z.txt"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(config.configured_lists.len(), 2);
        assert_eq!(config.configured_lists[0].list_type, None);
        assert_eq!(config.configured_lists[1].list_type, Some(ListType::Whitelist));
    }

    #[test]
    fn update_frequency_defaults() {
        let missing = PolicyConfig::from_json_str(r#"{"ConfiguredLists": []}"#).unwrap();
        assert_eq!(missing.update_frequency, DEFAULT_UPDATE_FREQUENCY);

        let zero = PolicyConfig::from_json_str(r#"{"ConfiguredLists": [], "UpdateFrequency": 0}"#).unwrap();
        assert_eq!(zero.update_frequency, MIN_UPDATE_FREQUENCY);

        let negative = PolicyConfig::from_json_str(r#"{"ConfiguredLists": [], "UpdateFrequency": -3}"#).unwrap();
        assert_eq!(negative.update_frequency, MIN_UPDATE_FREQUENCY);
    }

    #[test]
    fn malformed_custom_lists_read_empty() {
        let config = PolicyConfig::from_json_str(
            r#"{"ConfiguredLists": [], "CustomWhitelist": "oops", "SelfModeration": [1, 2]}"#,
        )
        .unwrap();
        assert!(config.custom_whitelist.is_empty());
        assert!(config.self_moderation.is_empty());
    }

    #[test]
    fn requires_configured_lists() {
        assert!(matches!(
            PolicyConfig::from_json_str(r#"{"UpdateFrequency": 10}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(PolicyConfig::from_json_str("[]").is_err());
    }

    #[test]
    fn category_names() {
        assert_eq!(category_name_for("/adult/domains.txt").as_deref(), Some("/adult/domains"));
        assert_eq!(category_name_for("lists\\news.rules").as_deref(), Some("lists\\news"));
        assert_eq!(category_name_for("/a/b/archive.tar.gz").as_deref(), Some("/a/b/archive.tar"));
        assert_eq!(category_name_for("/a/noext").as_deref(), Some("/a/noext"));
        assert_eq!(category_name_for("/a/.hidden").as_deref(), Some("/a/.hidden"));
        assert_eq!(category_name_for("toplevel.txt"), None);
        assert_eq!(category_name_for("/a/"), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(list_file_name("/adult/domains.txt"), ".adult.domains.txt");
        let list = ListConfig::new(ListType::Blacklist, "social/feeds.txt");
        assert_eq!(list.file_name(), "social.feeds.txt");
    }

    #[test]
    fn from_file_reports_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        assert!(matches!(PolicyConfig::from_file(&path), Err(ConfigError::Io { .. })));

        fs::write(&path, r#"{"ConfiguredLists": []}"#).unwrap();
        assert_eq!(PolicyConfig::from_file(&path).unwrap(), PolicyConfig::default());
    }
}
