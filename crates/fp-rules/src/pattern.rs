//! URL pattern compilation and verification
//!
//! A rule pattern such as `||ads.example^*banner|` compiles to a short list
//! of ops matched against the URL bytes. `*` matches any run, `^` matches a
//! separator byte or the end of the URL, everything else is literal.

use crate::url::{get_host_position, is_at_boundary};

/// Where a pattern may start matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorType {
    /// Anywhere in the URL
    #[default]
    None,
    /// At the start of the URL (`|`)
    Left,
    /// At the start of the host or of one of its labels (`||`)
    Hostname,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternOp {
    Lit(Vec<u8>),
    SkipAny,
    AssertBoundary,
}

/// Compiled URL pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    ops: Vec<PatternOp>,
    anchor: AnchorType,
    right_anchor: bool,
    match_case: bool,
}

impl Pattern {
    /// Compile the pattern text that follows any anchor markers.
    pub fn compile(text: &str, anchor: AnchorType, right_anchor: bool, match_case: bool) -> Self {
        let mut ops: Vec<PatternOp> = Vec::new();

        for b in text.bytes() {
            match b {
                b'*' => {
                    if ops.last() != Some(&PatternOp::SkipAny) {
                        ops.push(PatternOp::SkipAny);
                    }
                }
                b'^' => ops.push(PatternOp::AssertBoundary),
                _ => match ops.last_mut() {
                    Some(PatternOp::Lit(lit)) => lit.push(b),
                    _ => ops.push(PatternOp::Lit(vec![b])),
                },
            }
        }

        Self {
            ops,
            anchor,
            right_anchor,
            match_case,
        }
    }

    pub fn anchor(&self) -> AnchorType {
        self.anchor
    }

    /// Check whether the pattern matches `url`.
    ///
    /// Runs one pass per op over the set of URL positions the pattern can
    /// have reached, so the cost is bounded by `ops * url.len()`.
    pub fn matches(&self, url: &str) -> bool {
        let bytes = url.as_bytes();
        let mut reachable = vec![false; bytes.len() + 1];

        match self.anchor {
            AnchorType::Left => reachable[0] = true,
            AnchorType::None => reachable.fill(true),
            AnchorType::Hostname => {
                let Some((host_start, host_end)) = get_host_position(url) else {
                    return false;
                };
                for i in host_start..host_end {
                    if i == host_start || bytes[i - 1] == b'.' {
                        reachable[i] = true;
                    }
                }
            }
        }

        for op in &self.ops {
            self.advance(bytes, op, &mut reachable);
            if !reachable.contains(&true) {
                return false;
            }
        }

        if self.right_anchor {
            reachable[bytes.len()]
        } else {
            reachable.contains(&true)
        }
    }

    /// Replace the reachable positions with those reachable after `op`.
    ///
    /// Literal and boundary ops only move forward, so walking positions from
    /// the end never reads a slot this pass has already written.
    fn advance(&self, url: &[u8], op: &PatternOp, reachable: &mut [bool]) {
        match op {
            PatternOp::Lit(lit) => {
                for pos in (0..reachable.len()).rev() {
                    let hit = reachable[pos] && self.lit_at(url, pos, lit);
                    reachable[pos] = false;
                    if hit {
                        reachable[pos + lit.len()] = true;
                    }
                }
            }
            PatternOp::SkipAny => {
                if let Some(first) = reachable.iter().position(|&r| r) {
                    reachable[first..].fill(true);
                }
            }
            PatternOp::AssertBoundary => {
                for pos in (0..reachable.len()).rev() {
                    if !reachable[pos] || pos == url.len() {
                        continue;
                    }
                    reachable[pos] = false;
                    if is_at_boundary(url, pos) {
                        reachable[pos + 1] = true;
                    }
                }
            }
        }
    }

    fn lit_at(&self, url: &[u8], pos: usize, lit: &[u8]) -> bool {
        let Some(window) = url.get(pos..pos + lit.len()) else {
            return false;
        };
        if self.match_case {
            window == lit
        } else {
            window.eq_ignore_ascii_case(lit)
        }
    }
}
