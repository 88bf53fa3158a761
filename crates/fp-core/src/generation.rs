//! Generation building
//!
//! A generation is one complete, immutable build of the category registry,
//! the sharded matcher and the trigger trie. Builders are single-owner and
//! mutate freely; `finish` sorts the trie and hands back a frozen
//! [`Generation`] ready to be published.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::{list_file_name, BuildOptions, ConfigError, PolicyConfig};
use crate::matcher::{LoadCounts, MatcherError, ShardedMatcher};
use crate::registry::{
    CategoryRegistry, RegistryError, USER_CUSTOM_WHITELIST, USER_SELF_MODERATION,
    USER_TRIGGER_BLACKLIST,
};
use crate::rule::{FilterRule, RuleParseError, RuleParser};
use crate::trie::TriggerTree;
use crate::types::{CategoryId, ListType, MatchedCategory, Request};

/// Custom entries made only of these characters are bare tokens, not rules.
static SAFE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9\-_:./]+$").unwrap());

/// Error type for generation builds.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    #[error("failed to read list '{list}': {source}")]
    Io {
        list: String,
        #[source]
        source: io::Error,
    },
    #[error("{failed} rules failed to parse (limit {limit})")]
    TooManyFailures { failed: usize, limit: usize },
}

// =============================================================================
// List Sources
// =============================================================================

/// Delivers the contents of configured lists.
pub trait ListSource {
    /// Contents of a list, or `None` if the list is not available.
    fn read_list(&self, relative_path: &str) -> io::Result<Option<String>>;
}

/// Lists stored as flattened file names in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryListSource {
    dir: PathBuf,
}

impl DirectoryListSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn list_path(&self, relative_path: &str) -> PathBuf {
        self.dir.join(list_file_name(relative_path))
    }
}

impl ListSource for DirectoryListSource {
    fn read_list(&self, relative_path: &str) -> io::Result<Option<String>> {
        let path = self.list_path(relative_path);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                log::info!("Opening list {}", path.display());
                Ok(Some(contents))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory lists keyed by relative path.
impl ListSource for HashMap<String, String> {
    fn read_list(&self, relative_path: &str) -> io::Result<Option<String>> {
        Ok(self.get(relative_path).cloned())
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Counters collected while building a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub lists_loaded: usize,
    pub lists_skipped: usize,
    pub rules_loaded: usize,
    pub rules_failed: usize,
    pub triggers_loaded: usize,
    pub triggers_failed: usize,
    /// Categories that received a list in this build. The registry may hold
    /// more, kept from earlier generations so their ids stay stable.
    pub categories: usize,
    pub shards: usize,
}

// =============================================================================
// Generation
// =============================================================================

/// An immutable, queryable build.
#[derive(Debug)]
pub struct Generation<R> {
    pub(crate) number: u64,
    registry: CategoryRegistry,
    matcher: ShardedMatcher<R>,
    triggers: TriggerTree,
    stats: LoadStats,
}

impl<R> Generation<R> {
    /// A generation with no categories. Every query answers "no match".
    pub fn empty() -> Self {
        Self {
            number: 0,
            registry: CategoryRegistry::new(),
            matcher: ShardedMatcher::new(),
            triggers: TriggerTree::new(),
            stats: LoadStats::default(),
        }
    }

    /// Sequence number assigned when the generation was installed.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn matcher(&self) -> &ShardedMatcher<R> {
        &self.matcher
    }

    pub fn triggers(&self) -> &TriggerTree {
        &self.triggers
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Categories of the first trigger found in `text`.
    pub fn test_text(&self, text: &str) -> Vec<MatchedCategory> {
        self.triggers
            .contains_trigger(text)
            .map(|ids| self.describe(ids))
            .unwrap_or_default()
    }

    fn describe(&self, ids: &[CategoryId]) -> Vec<MatchedCategory> {
        ids.iter()
            .filter_map(|&id| self.registry.get(id))
            .map(MatchedCategory::from)
            .collect()
    }
}

impl<R: FilterRule> Generation<R> {
    pub fn test_url(&self, request: &Request<'_>, bypass_enabled: bool) -> Vec<MatchedCategory> {
        self.matcher.test_url_with(request, bypass_enabled)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds one generation from configured lists and custom rules.
pub struct GenerationBuilder<'p, P: RuleParser> {
    parser: &'p P,
    options: BuildOptions,
    registry: CategoryRegistry,
    matcher: ShardedMatcher<P::Rule>,
    triggers: TriggerTree,
    loaded_categories: HashSet<CategoryId>,
    stats: LoadStats,
}

impl<'p, P: RuleParser> GenerationBuilder<'p, P> {
    pub fn new(parser: &'p P, options: BuildOptions) -> Self {
        Self::seeded(parser, options, &CategoryRegistry::new())
    }

    /// Builder whose registry starts as a copy of `previous`, so category ids
    /// of an earlier generation keep their values.
    pub fn seeded(parser: &'p P, options: BuildOptions, previous: &CategoryRegistry) -> Self {
        let matcher = ShardedMatcher::with_shard_capacity(options.shard_capacity);
        Self {
            parser,
            options,
            registry: previous.clone(),
            matcher,
            triggers: TriggerTree::new(),
            loaded_categories: HashSet::new(),
            stats: LoadStats::default(),
        }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    /// Load one list's text under a category.
    ///
    /// Trigger lists go into the trie, every other list type into the matcher.
    pub fn add_list(&mut self, name: &str, list_type: ListType, text: &str) -> Result<LoadCounts, BuildError> {
        let category_id = self.registry.fetch_or_create(name, list_type)?.id;
        self.loaded_categories.insert(category_id);

        let counts = if list_type.holds_rules() {
            self.matcher.add_matcher(category_id, list_type)?;
            let counts = self.matcher.load_rules(self.parser, text, category_id, list_type)?;
            self.stats.rules_loaded += counts.loaded;
            self.stats.rules_failed += counts.failed;
            counts
        } else {
            let counts = self.triggers.load_triggers(text, category_id);
            self.stats.triggers_loaded += counts.loaded;
            self.stats.triggers_failed += counts.failed;
            counts
        };

        self.stats.lists_loaded += 1;
        Ok(counts)
    }

    /// Add individual rule entries under a category. Each entry is one rule.
    pub fn add_rules<'a, I>(&mut self, name: &str, list_type: ListType, entries: I) -> Result<LoadCounts, BuildError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let category_id = self.registry.fetch_or_create(name, list_type)?.id;
        self.loaded_categories.insert(category_id);
        let mut counts = LoadCounts::default();

        for entry in entries {
            match self.matcher.add_rule(self.parser, entry, category_id, list_type) {
                Ok(_) => counts.loaded += 1,
                Err(MatcherError::Parse(RuleParseError::Comment | RuleParseError::Empty)) => {
                    counts.skipped += 1;
                }
                Err(MatcherError::Parse(e)) => {
                    log::debug!("Error parsing rule '{}': {}", entry, e);
                    counts.failed += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.stats.rules_loaded += counts.loaded;
        self.stats.rules_failed += counts.failed;
        Ok(counts)
    }

    /// Load every list a configuration names, then the user's custom rules.
    pub fn load_config<S>(&mut self, config: &PolicyConfig, source: &S) -> Result<(), BuildError>
    where
        S: ListSource + ?Sized,
    {
        for list in &config.configured_lists {
            let path = &list.relative_list_path;

            let Some(list_type) = list.list_type else {
                log::warn!("Skipping list {} with unknown list type", path);
                self.stats.lists_skipped += 1;
                continue;
            };
            let Some(name) = list.category_name() else {
                log::warn!("Skipping list {} without a directory", path);
                self.stats.lists_skipped += 1;
                continue;
            };

            let contents = source.read_list(path).map_err(|e| BuildError::Io {
                list: path.clone(),
                source: e,
            })?;
            match contents {
                Some(text) => {
                    let counts = self.add_list(&name, list_type, &text)?;
                    log::debug!("Loaded {} ({}): {:?}", name, list_type, counts);
                }
                None => {
                    log::info!("List {} is not available, skipping", path);
                    self.stats.lists_skipped += 1;
                }
            }
        }

        if !config.custom_trigger_blacklist.is_empty() {
            let text = config.custom_trigger_blacklist.join("\n");
            self.add_list(USER_TRIGGER_BLACKLIST, ListType::TextTrigger, &text)?;
        }

        let whitelist = custom_rules(&config.custom_whitelist);
        if !whitelist.is_empty() {
            self.add_rules(USER_CUSTOM_WHITELIST, ListType::Whitelist, whitelist)?;
        }

        let self_moderation = custom_rules(&config.self_moderation);
        if !self_moderation.is_empty() {
            self.add_rules(USER_SELF_MODERATION, ListType::Blacklist, self_moderation)?;
        }

        Ok(())
    }

    /// Sort the trie and freeze the build.
    pub fn finish(mut self) -> Result<Generation<P::Rule>, BuildError> {
        if let Some(limit) = self.options.max_failed_rules {
            if self.stats.rules_failed > limit {
                return Err(BuildError::TooManyFailures {
                    failed: self.stats.rules_failed,
                    limit,
                });
            }
        }

        self.triggers.sort_tree();
        self.stats.categories = self.loaded_categories.len();
        self.stats.shards = self.matcher.shard_count();

        log::info!(
            "Loaded {} rules, {} rules failed most likely due to being malformed, and {} text triggers loaded.",
            self.stats.rules_loaded,
            self.stats.rules_failed,
            self.stats.triggers_loaded
        );

        Ok(Generation {
            number: 0,
            registry: self.registry,
            matcher: self.matcher,
            triggers: self.triggers,
            stats: self.stats,
        })
    }
}

/// Custom entries that look like rules. Bare tokens such as `example.com`
/// are dropped.
fn custom_rules(entries: &[String]) -> Vec<&str> {
    entries
        .iter()
        .map(String::as_str)
        .filter(|entry| !SAFE_TOKEN.is_match(entry))
        .collect()
}
