//! Text-trigger trie
//!
//! Trigger phrases are inserted character by character. A literal space in a
//! phrase becomes a separator node, which matches any separator character at
//! query time. Matches are only reported for whole tokens: the character after
//! the matched phrase must be a separator or the end of the text.
//!
//! The tree follows an insert, sort, query lifecycle. `sort_tree` orders every
//! node's children so lookups can binary search; a tree queried before sorting
//! falls back to scanning children linearly.

use crate::matcher::LoadCounts;
use crate::separator::is_separator;
use crate::types::CategoryId;

/// Longest accepted trigger phrase, in characters. Bounds the depth of the
/// trie, and with it the recursion of clone and drop.
pub const MAX_TRIGGER_CHARS: usize = 1024;

// =============================================================================
// Nodes
// =============================================================================

/// Kind of a trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Character,
    Separator,
}

/// A single node of the trigger trie.
#[derive(Debug, Clone)]
pub struct TriggerNode {
    kind: NodeKind,
    symbol: char,
    children: Vec<TriggerNode>,
    categories: Vec<CategoryId>,
}

impl TriggerNode {
    fn root() -> Self {
        Self {
            kind: NodeKind::Root,
            symbol: '\0',
            children: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Node kind is decided by the literal space only, not by `is_separator`.
    fn for_symbol(symbol: char) -> Self {
        let kind = if symbol == ' ' {
            NodeKind::Separator
        } else {
            NodeKind::Character
        };
        Self {
            kind,
            symbol,
            children: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    pub fn children(&self) -> &[TriggerNode] {
        &self.children
    }

    pub fn categories(&self) -> &[CategoryId] {
        &self.categories
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn attach(&mut self, category: CategoryId) {
        if !self.categories.contains(&category) {
            self.categories.push(category);
        }
    }

    /// Find the child for a (case-folded) text character.
    ///
    /// An exact symbol match wins. A separator character falls back to the
    /// separator child, which stands in for every separator.
    fn find_child(&self, c: char, sorted: bool) -> Option<&TriggerNode> {
        if self.children.is_empty() {
            return None;
        }

        if sorted {
            if let Ok(idx) = self.children.binary_search_by(|child| child.symbol.cmp(&c)) {
                return Some(&self.children[idx]);
            }
            if is_separator(c) {
                if let Ok(idx) = self.children.binary_search_by(|child| child.symbol.cmp(&' ')) {
                    let child = &self.children[idx];
                    if child.kind == NodeKind::Separator {
                        return Some(child);
                    }
                }
            }
            return None;
        }

        if let Some(child) = self.children.iter().find(|child| child.symbol == c) {
            return Some(child);
        }
        if is_separator(c) {
            return self
                .children
                .iter()
                .find(|child| child.kind == NodeKind::Separator);
        }
        None
    }
}

// =============================================================================
// Tree
// =============================================================================

/// Trie of trigger phrases with per-node category attribution.
#[derive(Debug, Clone)]
pub struct TriggerTree {
    root: TriggerNode,
    sorted: bool,
    trigger_count: usize,
}

impl Default for TriggerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerTree {
    pub fn new() -> Self {
        Self {
            root: TriggerNode::root(),
            sorted: true,
            trigger_count: 0,
        }
    }

    pub fn root(&self) -> &TriggerNode {
        &self.root
    }

    /// Whether children are ordered for binary search.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Number of triggers inserted so far.
    pub fn trigger_count(&self) -> usize {
        self.trigger_count
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Insert a trigger phrase for a category.
    ///
    /// Empty phrases are rejected; attaching a category to the root would make
    /// every text match. Phrases longer than [`MAX_TRIGGER_CHARS`] are rejected
    /// too.
    pub fn add_trigger(&mut self, text: &str, category: CategoryId) -> bool {
        if text.is_empty() || text.chars().nth(MAX_TRIGGER_CHARS).is_some() {
            return false;
        }

        let mut node = &mut self.root;
        for c in text.chars().map(fold_case) {
            let idx = match node.children.iter().position(|child| child.symbol == c) {
                Some(idx) => idx,
                None => {
                    node.children.push(TriggerNode::for_symbol(c));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }

        node.attach(category);
        self.sorted = false;
        self.trigger_count += 1;
        true
    }

    /// Insert every non-empty line of `text` as a trigger.
    ///
    /// Empty lines count as skipped, lines [`add_trigger`](Self::add_trigger)
    /// rejects as failed.
    pub fn load_triggers(&mut self, text: &str, category: CategoryId) -> LoadCounts {
        let mut counts = LoadCounts::default();
        for line in text.split(is_line_break) {
            if line.is_empty() {
                counts.skipped += 1;
            } else if self.add_trigger(line, category) {
                counts.loaded += 1;
            } else {
                log::debug!("Rejected trigger of {} bytes for category {}", line.len(), category);
                counts.failed += 1;
            }
        }
        counts
    }

    /// Order the children of every node by symbol. Idempotent.
    pub fn sort_tree(&mut self) {
        let mut stack = vec![&mut self.root];
        while let Some(node) = stack.pop() {
            node.children.sort_by_key(|child| child.symbol);
            stack.extend(node.children.iter_mut());
        }
        self.sorted = true;
    }

    /// Find the first trigger occurring as a whole token in `text`.
    ///
    /// Returns the categories attached to that trigger.
    pub fn contains_trigger(&self, text: &str) -> Option<&[CategoryId]> {
        let mut current = &self.root;
        let mut pos = 0;

        while let Some(raw) = text[pos..].chars().next() {
            let next_pos = pos + raw.len_utf8();

            let node = match current.find_child(fold_case(raw), self.sorted) {
                Some(node) => node,
                None => {
                    current = &self.root;
                    pos = skip_token(text, pos);
                    continue;
                }
            };

            if !node.categories.is_empty() {
                let at_boundary = text[next_pos..].chars().next().map_or(true, is_separator);
                if at_boundary {
                    return Some(&node.categories);
                }
            }

            if node.is_leaf() {
                current = &self.root;
                pos = skip_token(text, pos);
                continue;
            }

            current = node;
            pos = next_pos;
        }

        None
    }
}

/// Lower-case a character, keeping the first scalar of multi-char mappings.
#[inline]
fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[inline]
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Byte offset of the first non-separator after the separator run that
/// follows `pos`, or the end of the text.
fn skip_token(text: &str, pos: usize) -> usize {
    let mut seen_separator = false;
    for (offset, c) in text[pos..].char_indices() {
        let sep = is_separator(c);
        if sep {
            seen_separator = true;
        } else if seen_separator {
            return pos + offset;
        }
    }
    text.len()
}
