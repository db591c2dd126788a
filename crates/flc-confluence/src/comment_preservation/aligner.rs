//! Text run alignment.
//!
//! Ratcliff/Obershelp matching: find the longest matching block, recurse on
//! the pieces left and right of it, then describe the gaps between matching
//! blocks as edit opcodes. Tie-breaking (earliest longest block wins) and the
//! popular-element heuristic for long sequences follow the classic
//! `SequenceMatcher` behavior, so opcode sequences are reproducible.

use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Range;

/// Sequences at least this long drop popular elements from the index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Kind of an alignment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Runs are identical.
    Equal,
    /// Old runs were replaced by new runs.
    Replace,
    /// Old runs were removed.
    Delete,
    /// New runs were added.
    Insert,
}

/// One alignment step over old and new run indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    /// What happened to the runs.
    pub kind: OpKind,
    /// Affected old run indices.
    pub old_range: Range<usize>,
    /// Affected new run indices.
    pub new_range: Range<usize>,
}

/// Matching block: `a[a_start..a_start + len] == b[b_start..b_start + len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a_start: usize,
    b_start: usize,
    len: usize,
}

/// Align two lists of text runs.
///
/// Runs are compared with surrounding whitespace stripped.
#[must_use]
pub fn align(old_runs: &[&str], new_runs: &[&str]) -> Vec<Opcode> {
    let old: Vec<&str> = old_runs.iter().map(|s| s.trim()).collect();
    let new: Vec<&str> = new_runs.iter().map(|s| s.trim()).collect();
    SequenceMatcher::new(&old, &new).opcodes()
}

/// Matcher over two sequences of hashable items.
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions in `b` of every non-popular element.
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    /// Index `b` for matching.
    #[must_use]
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, item) in b.iter().enumerate() {
            b2j.entry(item).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }

        Self { a, b, b2j }
    }

    /// Longest matching block within `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Among blocks of equal length the one starting earliest in `a`, then
    /// earliest in `b`, wins.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let mut best = Block {
            a_start: alo,
            b_start: blo,
            len: 0,
        };
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > best.len {
                        best = Block {
                            a_start: i + 1 - k,
                            b_start: j + 1 - k,
                            len: k,
                        };
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular elements are not indexed; let them extend a block.
        while best.a_start > alo
            && best.b_start > blo
            && self.a[best.a_start - 1] == self.b[best.b_start - 1]
        {
            best.a_start -= 1;
            best.b_start -= 1;
            best.len += 1;
        }
        while best.a_start + best.len < ahi
            && best.b_start + best.len < bhi
            && self.a[best.a_start + best.len] == self.b[best.b_start + best.len]
        {
            best.len += 1;
        }

        best
    }

    /// Non-adjacent matching blocks in order, ending with an empty sentinel
    /// block at `(len(a), len(b))`.
    fn matching_blocks(&self) -> Vec<Block> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.longest_match(alo, ahi, blo, bhi);
            if block.len == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.len);
            blocks.push(block);
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort_unstable();

        let mut merged: Vec<Block> = Vec::with_capacity(blocks.len() + 1);
        for block in blocks {
            if let Some(last) = merged.last_mut()
                && last.a_start + last.len == block.a_start
                && last.b_start + last.len == block.b_start
            {
                last.len += block.len;
            } else {
                merged.push(block);
            }
        }
        merged.push(Block {
            a_start: la,
            b_start: lb,
            len: 0,
        });
        merged
    }

    /// Edit script turning `a` into `b`.
    #[must_use]
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut i = 0;
        let mut j = 0;
        let mut opcodes = Vec::new();

        for block in self.matching_blocks() {
            let kind = match (i < block.a_start, j < block.b_start) {
                (true, true) => Some(OpKind::Replace),
                (true, false) => Some(OpKind::Delete),
                (false, true) => Some(OpKind::Insert),
                (false, false) => None,
            };
            if let Some(kind) = kind {
                opcodes.push(Opcode {
                    kind,
                    old_range: i..block.a_start,
                    new_range: j..block.b_start,
                });
            }
            i = block.a_start + block.len;
            j = block.b_start + block.len;
            if block.len > 0 {
                opcodes.push(Opcode {
                    kind: OpKind::Equal,
                    old_range: block.a_start..i,
                    new_range: block.b_start..j,
                });
            }
        }

        opcodes
    }
}
