//! Category-Sharded Matcher
//!
//! Rules are grouped per category and chunked into fixed-capacity shards.
//! Main groups (blacklists and whitelists) take precedence over bypass
//! groups: bypass groups are only consulted when no main category matched.
//!
//! Rule ids come from one counter shared by every shard of a matcher. A new
//! shard is started whenever that counter reaches a multiple of the shard
//! capacity, and whenever rules for a different category start arriving.

use std::fs;
use std::path::{Path, PathBuf};

use crate::rule::{FilterRule, RuleParseError, RuleParser};
use crate::types::{CategoryId, ListType, MatchedCategory, Request};

/// Default number of rules per shard.
pub const DEFAULT_SHARD_CAPACITY: usize = 1000;

/// Sequential rule id, unique within one matcher.
pub type RuleId = u32;

/// Error type for matcher construction.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("failed to parse rule: {0}")]
    Parse(#[from] RuleParseError),
    #[error("category {category_id} already has {existing} groups, cannot add {requested} rules")]
    GroupListMismatch {
        category_id: CategoryId,
        existing: ListType,
        requested: ListType,
    },
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loaded/failed line counts for one rule list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadCounts {
    pub loaded: usize,
    pub failed: usize,
    /// Blank and comment lines
    pub skipped: usize,
}

impl std::ops::AddAssign for LoadCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.loaded += rhs.loaded;
        self.failed += rhs.failed;
        self.skipped += rhs.skipped;
    }
}

// =============================================================================
// Shards and Groups
// =============================================================================

/// Append-only batch of rules.
#[derive(Debug)]
pub struct RuleShard<R> {
    rules: Vec<(RuleId, R)>,
}

impl<R> RuleShard<R> {
    fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.rules.iter().map(|(id, _)| *id)
    }
}

impl<R: FilterRule> RuleShard<R> {
    /// Whether any rule of the shard matches. Rule errors count as no match.
    fn matches(&self, request: &Request<'_>) -> bool {
        for (rule_id, rule) in &self.rules {
            match rule.matches(request) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Error matching rule {} against '{}': {}", rule_id, request.url, e);
                }
            }
        }
        false
    }
}

/// All shards of one category.
#[derive(Debug)]
pub struct CategoryShardGroup<R> {
    category_id: CategoryId,
    list_type: ListType,
    shards: Vec<RuleShard<R>>,
}

impl<R> CategoryShardGroup<R> {
    fn new(category_id: CategoryId, list_type: ListType) -> Self {
        Self {
            category_id,
            list_type,
            shards: Vec::new(),
        }
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    pub fn list_type(&self) -> ListType {
        self.list_type
    }

    pub fn shards(&self) -> &[RuleShard<R>] {
        &self.shards
    }

    pub fn rule_count(&self) -> usize {
        self.shards.iter().map(RuleShard::len).sum()
    }

    fn descriptor(&self) -> MatchedCategory {
        MatchedCategory {
            id: self.category_id,
            list_type: self.list_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupList {
    Main,
    Bypass,
}

impl GroupList {
    fn for_list_type(list_type: ListType) -> Self {
        if list_type.is_bypass() {
            Self::Bypass
        } else {
            Self::Main
        }
    }
}

/// The shard rules are currently appended to: always the last shard of a group.
#[derive(Debug, Clone, Copy)]
struct ActiveShard {
    list: GroupList,
    group: usize,
}

// =============================================================================
// Matcher
// =============================================================================

/// Category-sharded rule matcher.
#[derive(Debug)]
pub struct ShardedMatcher<R> {
    main_groups: Vec<CategoryShardGroup<R>>,
    bypass_groups: Vec<CategoryShardGroup<R>>,
    active: Option<ActiveShard>,
    rule_count: RuleId,
    shard_capacity: usize,
    bypass_enabled: bool,
}

impl<R> Default for ShardedMatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ShardedMatcher<R> {
    pub fn new() -> Self {
        Self::with_shard_capacity(DEFAULT_SHARD_CAPACITY)
    }

    pub fn with_shard_capacity(shard_capacity: usize) -> Self {
        Self {
            main_groups: Vec::new(),
            bypass_groups: Vec::new(),
            active: None,
            rule_count: 0,
            shard_capacity: shard_capacity.max(1),
            bypass_enabled: false,
        }
    }

    pub fn shard_capacity(&self) -> usize {
        self.shard_capacity
    }

    /// Number of rules added so far (also the next rule id).
    pub fn rule_count(&self) -> usize {
        self.rule_count as usize
    }

    pub fn shard_count(&self) -> usize {
        self.main_groups
            .iter()
            .chain(&self.bypass_groups)
            .map(|group| group.shards.len())
            .sum()
    }

    pub fn main_groups(&self) -> &[CategoryShardGroup<R>] {
        &self.main_groups
    }

    pub fn bypass_groups(&self) -> &[CategoryShardGroup<R>] {
        &self.bypass_groups
    }

    /// Group for a category, searched in both group lists.
    pub fn group(&self, category_id: CategoryId) -> Option<&CategoryShardGroup<R>> {
        self.main_groups
            .iter()
            .chain(&self.bypass_groups)
            .find(|group| group.category_id == category_id)
    }

    pub fn bypass_enabled(&self) -> bool {
        self.bypass_enabled
    }

    /// When enabled, bypass groups are not evaluated.
    pub fn set_bypass_enabled(&mut self, enabled: bool) {
        self.bypass_enabled = enabled;
    }

    fn groups(&self, list: GroupList) -> &Vec<CategoryShardGroup<R>> {
        match list {
            GroupList::Main => &self.main_groups,
            GroupList::Bypass => &self.bypass_groups,
        }
    }

    fn groups_mut(&mut self, list: GroupList) -> &mut Vec<CategoryShardGroup<R>> {
        match list {
            GroupList::Main => &mut self.main_groups,
            GroupList::Bypass => &mut self.bypass_groups,
        }
    }

    /// Find or create the group for a category and make a fresh shard of it
    /// the active shard.
    ///
    /// Bypass lists go to the bypass group list, everything else to the main
    /// list. An empty trailing shard is reused instead of adding another.
    pub fn add_matcher(&mut self, category_id: CategoryId, list_type: ListType) -> Result<(), MatcherError> {
        self.open_shard(category_id, list_type).map(|_| ())
    }

    fn open_shard(&mut self, category_id: CategoryId, list_type: ListType) -> Result<ActiveShard, MatcherError> {
        let list = GroupList::for_list_type(list_type);
        let other = match list {
            GroupList::Main => GroupList::Bypass,
            GroupList::Bypass => GroupList::Main,
        };

        if let Some(existing) = self
            .groups(other)
            .iter()
            .find(|group| group.category_id == category_id)
        {
            return Err(MatcherError::GroupListMismatch {
                category_id,
                existing: existing.list_type,
                requested: list_type,
            });
        }

        let groups = self.groups_mut(list);
        let group_idx = match groups.iter().position(|group| group.category_id == category_id) {
            Some(idx) => idx,
            None => {
                groups.push(CategoryShardGroup::new(category_id, list_type));
                groups.len() - 1
            }
        };

        let group = &mut groups[group_idx];
        if group.shards.last().map_or(true, |shard| !shard.is_empty()) {
            group.shards.push(RuleShard::new());
        }

        let active = ActiveShard {
            list,
            group: group_idx,
        };
        self.active = Some(active);
        Ok(active)
    }

    fn active_is(&self, category_id: CategoryId, list_type: ListType) -> bool {
        match self.active {
            Some(active) => {
                active.list == GroupList::for_list_type(list_type)
                    && self.groups(active.list)[active.group].category_id == category_id
            }
            None => false,
        }
    }

    /// Append an already parsed rule for a category and return its id.
    pub fn insert_rule(
        &mut self,
        rule: R,
        category_id: CategoryId,
        list_type: ListType,
    ) -> Result<RuleId, MatcherError> {
        let at_boundary = self.rule_count as usize % self.shard_capacity == 0;
        let active = match self.active {
            Some(active) if !at_boundary && self.active_is(category_id, list_type) => active,
            _ => self.open_shard(category_id, list_type)?,
        };

        let rule_id = self.rule_count;
        let group = &mut self.groups_mut(active.list)[active.group];
        match group.shards.last_mut() {
            Some(shard) => shard.rules.push((rule_id, rule)),
            None => {
                let mut shard = RuleShard::new();
                shard.rules.push((rule_id, rule));
                group.shards.push(shard);
            }
        }

        self.rule_count += 1;
        Ok(rule_id)
    }

    /// Parse a rule line and append it for a category.
    pub fn add_rule<P>(
        &mut self,
        parser: &P,
        line: &str,
        category_id: CategoryId,
        list_type: ListType,
    ) -> Result<RuleId, MatcherError>
    where
        P: RuleParser<Rule = R>,
    {
        let rule = parser.parse_rule(line)?;
        self.insert_rule(rule, category_id, list_type)
    }

    /// Add every line of `text` as a rule.
    ///
    /// Unparseable lines are logged and counted as failed; blank and comment
    /// lines are skipped. Only a group list mismatch aborts the load.
    pub fn load_rules<P>(
        &mut self,
        parser: &P,
        text: &str,
        category_id: CategoryId,
        list_type: ListType,
    ) -> Result<LoadCounts, MatcherError>
    where
        P: RuleParser<Rule = R>,
    {
        let mut counts = LoadCounts::default();

        for line in text.split(['\n', '\r']) {
            if line.trim().is_empty() {
                counts.skipped += 1;
                continue;
            }

            match self.add_rule(parser, line, category_id, list_type) {
                Ok(_) => counts.loaded += 1,
                Err(MatcherError::Parse(RuleParseError::Comment | RuleParseError::Empty)) => {
                    counts.skipped += 1;
                }
                Err(MatcherError::Parse(e)) => {
                    log::debug!("Error parsing rule '{}': {}", line, e);
                    counts.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(counts)
    }

    /// Load a rule file into a category, starting a fresh shard for it.
    pub fn parse_rule_file<P>(
        &mut self,
        parser: &P,
        path: &Path,
        category_id: CategoryId,
        list_type: ListType,
    ) -> Result<LoadCounts, MatcherError>
    where
        P: RuleParser<Rule = R>,
    {
        let contents = fs::read_to_string(path).map_err(|source| MatcherError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Opening rules {}", path.display());
        self.add_matcher(category_id, list_type)?;
        self.load_rules(parser, &contents, category_id, list_type)
    }
}

impl<R: FilterRule> ShardedMatcher<R> {
    /// Categories matching a request, honoring the matcher's bypass flag.
    pub fn test_url(&self, request: &Request<'_>) -> Vec<MatchedCategory> {
        self.test_url_with(request, self.bypass_enabled)
    }

    /// Categories matching a request.
    ///
    /// Any main-group match is returned as is. Bypass groups are evaluated
    /// only when nothing in the main groups matched and `bypass_enabled` is
    /// off. Each category appears at most once.
    pub fn test_url_with(&self, request: &Request<'_>, bypass_enabled: bool) -> Vec<MatchedCategory> {
        let matched = match_groups(&self.main_groups, request);
        if !matched.is_empty() {
            return matched;
        }

        if bypass_enabled {
            return Vec::new();
        }

        match_groups(&self.bypass_groups, request)
    }
}

fn match_groups<R: FilterRule>(groups: &[CategoryShardGroup<R>], request: &Request<'_>) -> Vec<MatchedCategory> {
    groups
        .iter()
        .filter(|group| group.shards.iter().any(|shard| shard.matches(request)))
        .map(CategoryShardGroup::descriptor)
        .collect()
}
