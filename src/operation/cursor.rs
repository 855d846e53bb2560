//! Two-cursor merge support shared by `compose` and `transform`.
//!
//! A [`Cursor`] walks an operation's entries and exposes the remaining part of
//! the current entry as a borrowed [`Head`]. Partially consuming a head only
//! shrinks a count or re-slices the borrowed text; nothing is cloned.

use super::{BasicOperation, Operation};
use std::slice;

/// What is left of the current entry of one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Head<'a> {
    Retain(usize),
    /// Remaining text and its length in chars.
    Insert(&'a str, usize),
    Delete(usize),
}

impl<'a> From<&'a BasicOperation> for Head<'a> {
    fn from(op: &'a BasicOperation) -> Self {
        match op {
            BasicOperation::Retain(n) => Head::Retain(*n),
            BasicOperation::Insert(s) => Head::Insert(s, s.chars().count()),
            BasicOperation::Delete(n) => Head::Delete(*n),
        }
    }
}

pub(super) struct Cursor<'a> {
    entries: slice::Iter<'a, BasicOperation>,
    head: Option<Head<'a>>,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(operation: &'a Operation) -> Self {
        let mut entries = operation.operations().iter();
        let head = entries.next().map(Head::from);
        Cursor { entries, head }
    }

    /// Current head, `None` once every entry has been consumed.
    pub(super) fn head(&self) -> Option<Head<'a>> {
        self.head
    }

    /// Drop the rest of the current head and move to the next entry.
    pub(super) fn take_all(&mut self) {
        self.head = self.entries.next().map(Head::from);
    }

    /// Consume `n` units (chars or counts) of the current head, moving to the
    /// next entry when it is used up. `n` never exceeds the head's length.
    pub(super) fn take(&mut self, n: usize) {
        self.head = match self.head {
            Some(Head::Retain(count)) if count > n => Some(Head::Retain(count - n)),
            Some(Head::Delete(count)) if count > n => Some(Head::Delete(count - n)),
            Some(Head::Insert(text, len)) if len > n => {
                Some(Head::Insert(split_chars(text, n).1, len - n))
            }
            Some(_) => self.entries.next().map(Head::from),
            None => None,
        };
    }
}

/// Split `text` after its first `n` chars.
pub(super) fn split_chars(text: &str, n: usize) -> (&str, &str) {
    let at = text
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(index, _)| index);
    text.split_at(at)
}
