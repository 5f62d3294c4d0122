//! Edit scripts between two lists of commands.

use std::collections::HashMap;
use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Equal,
    Delete,
    Insert,
}

/// One step of an edit script, given as ranges into both lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub op: Op,
    pub a: Range<usize>,
    pub b: Range<usize>,
}

impl Edit {
    fn new(op: Op, a: Range<usize>, b: Range<usize>) -> Self {
        Self { op, a, b }
    }

    pub fn is_equal(&self) -> bool {
        self.op == Op::Equal
    }

    pub fn is_delete(&self) -> bool {
        self.op == Op::Delete
    }

    pub fn is_insert(&self) -> bool {
        self.op == Op::Insert
    }
}

/// Shortest edit script of two ordered lists of keys.
///
/// A replaced block is split into a delete followed by an insert.
pub(crate) fn myers(a: &[String], b: &[String]) -> Vec<Edit> {
    let mut result = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, a, b) {
        let (tag, old, new) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => result.push(Edit::new(Op::Equal, old, new)),
            DiffTag::Delete => result.push(Edit::new(Op::Delete, old, new.start..new.start)),
            DiffTag::Insert => result.push(Edit::new(Op::Insert, old.start..old.start, new)),
            DiffTag::Replace => {
                result.push(Edit::new(Op::Delete, old.clone(), new.start..new.start));
                result.push(Edit::new(Op::Insert, old.end..old.end, new));
            }
        }
    }
    result
}

/// Edit script of two lists where order doesn't matter.
///
/// Equal keys are paired in order of `a`, remaining elements of `a` are
/// deleted and remaining elements of `b` are inserted at end of `a`.
pub(crate) fn unordered(a: &[String], b: &[String]) -> Vec<Edit> {
    let mut result: Vec<Edit> = Vec::new();
    let mut unpaired: HashMap<&str, Option<usize>> = HashMap::new();
    for (j, k) in b.iter().enumerate() {
        unpaired.insert(k, Some(j));
    }
    for (i, k) in a.iter().enumerate() {
        match unpaired.get_mut(k.as_str()).and_then(Option::take) {
            Some(j) => match result.last_mut() {
                Some(prev) if prev.is_equal() && prev.a.end == i && prev.b.end == j => {
                    prev.a.end = i + 1;
                    prev.b.end = j + 1;
                }
                _ => result.push(Edit::new(Op::Equal, i..i + 1, j..j + 1)),
            },
            None => match result.last_mut() {
                Some(prev) if prev.is_delete() && prev.a.end == i => prev.a.end = i + 1,
                _ => result.push(Edit::new(Op::Delete, i..i + 1, 0..0)),
            },
        }
    }
    let l = a.len();
    for (j, k) in b.iter().enumerate() {
        if unpaired.get(k.as_str()).is_some_and(Option::is_none) {
            continue;
        }
        match result.last_mut() {
            Some(prev) if prev.is_insert() && prev.b.end == j => prev.b.end = j + 1,
            _ => result.push(Edit::new(Op::Insert, l..l, j..j + 1)),
        }
    }
    result
}

/// Number of inserted and deleted elements.
pub(crate) fn stat(script: &[Edit]) -> (usize, usize) {
    script.iter().fold((0, 0), |(ins, del), e| match e.op {
        Op::Insert => (ins + e.b.len(), del),
        Op::Delete => (ins, del + e.a.len()),
        Op::Equal => (ins, del),
    })
}

pub(crate) fn is_identity(script: &[Edit]) -> bool {
    script.iter().all(Edit::is_equal)
}
