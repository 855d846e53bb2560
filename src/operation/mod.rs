//! The operation algebra: a canonical representation of a plain-text edit plus
//! the four pure functions OT needs over it.
//!
//! An [`Operation`] walks the input document from left to right with a cursor.
//! Each [`BasicOperation`] either keeps (`Retain`), adds (`Insert`) or removes
//! (`Delete`) text at the cursor:
//!
//! ```text
//! doc:   a b c     d e
//! op:    retain(3) insert("X") retain(2)
//! out:   a b c X d e
//! ```
//!
//! | Function | Law |
//! |----------|-----|
//! | [`Operation::apply`] | `apply(op, doc)` has length `op.target_length()` |
//! | [`Operation::invert`] | `apply(invert(op, doc), apply(op, doc)) == doc` |
//! | [`compose`] | `apply(compose(a, b), doc) == apply(b, apply(a, doc))` |
//! | [`transform`] | `apply(b', apply(a, doc)) == apply(a', apply(b, doc))` |
//!
//! Lengths are counted in Unicode scalar values (`char`s).
//!
//! # Examples
//!
//! ```
//! use ot_sync::Operation;
//!
//! let op = Operation::new().retain(3).insert("X").retain(2);
//! assert_eq!(op.base_length(), 5);
//! assert_eq!(op.target_length(), 6);
//! assert_eq!(op.apply("abcde").unwrap(), "abcXde");
//! ```
//!
//! ## Concurrent Edits
//!
//! ```
//! use ot_sync::operation::transform;
//! use ot_sync::Operation;
//!
//! let doc = "0123";
//! let a = Operation::insert_at(4, 3, "456").unwrap();
//! let b = Operation::delete_at(4, 1, 3).unwrap();
//!
//! let (a_prime, b_prime) = transform(&a, &b).unwrap();
//! let left = b_prime.apply(&a.apply(doc).unwrap()).unwrap();
//! let right = a_prime.apply(&b.apply(doc).unwrap()).unwrap();
//! assert_eq!(left, right);
//! ```

mod compose;
mod cursor;
mod transform;

pub use compose::compose;
pub use transform::transform;

use crate::error::{OtError, Result};
use serde::{Deserialize, Serialize};

/// One step of an [`Operation`].
///
/// On the wire each step is exactly one of `{"retain": n}`, `{"insert": s}`
/// or `{"delete": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "crate::protocol::codec::WireRecord")]
pub enum BasicOperation {
    /// Keep the next `n` characters of the input.
    Retain(usize),
    /// Insert literal text without consuming input.
    Insert(String),
    /// Remove the next `n` characters of the input.
    Delete(usize),
}

impl BasicOperation {
    /// A zero-length step. Canonical operations never contain one.
    pub fn is_empty(&self) -> bool {
        match self {
            BasicOperation::Retain(n) | BasicOperation::Delete(n) => *n == 0,
            BasicOperation::Insert(s) => s.is_empty(),
        }
    }
}

/// A canonical sequence of retain/insert/delete steps taking a document of
/// `base_length` characters to one of `target_length` characters.
///
/// The only mutators are [`add_retain`](Self::add_retain),
/// [`add_insert`](Self::add_insert) and [`add_delete`](Self::add_delete) (and
/// their consuming builder twins). They drop zero-length steps and merge a step
/// into the trailing one when both are of the same kind, so every `Operation`
/// is canonical and two operations describing the same edit compare equal.
///
/// # Invariants
///
/// - No entry is empty
/// - No two adjacent entries have the same kind
/// - `base_length` = sum of retain and delete counts
/// - `target_length` = sum of retain counts and inserted characters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<BasicOperation>", try_from = "Vec<BasicOperation>")]
pub struct Operation {
    ops: Vec<BasicOperation>,
    base_length: usize,
    target_length: usize,
}

impl Operation {
    /// Create an empty operation (applies only to the empty document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a canonical operation from arbitrary steps.
    ///
    /// Empty steps are dropped and adjacent steps of the same kind merged, so
    /// the result may have fewer entries than the input.
    pub fn from_basic_operations<I>(ops: I) -> Self
    where
        I: IntoIterator<Item = BasicOperation>,
    {
        let mut operation = Operation::new();
        for op in ops {
            operation.push(op);
        }
        operation
    }

    /// Like [`from_basic_operations`](Self::from_basic_operations), for steps
    /// from an untrusted source.
    ///
    /// Fails with [`OtError::LengthMismatch`] instead of overflowing when the
    /// counts do not fit in `usize`.
    pub fn try_from_basic_operations<I>(ops: I) -> Result<Self>
    where
        I: IntoIterator<Item = BasicOperation>,
    {
        let mut operation = Operation::new();
        for op in ops {
            operation.check_growth(&op)?;
            operation.push(op);
        }
        Ok(operation)
    }

    /// Operation inserting `text` at char position `pos` of a document of
    /// `doc_len` characters.
    pub fn insert_at(doc_len: usize, pos: usize, text: &str) -> Result<Self> {
        if pos > doc_len {
            return Err(OtError::length_mismatch("insert position", doc_len, pos));
        }
        Ok(Operation::new()
            .retain(pos)
            .insert(text)
            .retain(doc_len - pos))
    }

    /// Operation deleting `count` characters starting at char position `pos`
    /// of a document of `doc_len` characters.
    pub fn delete_at(doc_len: usize, pos: usize, count: usize) -> Result<Self> {
        let end = pos.saturating_add(count);
        if end > doc_len {
            return Err(OtError::length_mismatch("delete span", doc_len, end));
        }
        Ok(Operation::new()
            .retain(pos)
            .delete(count)
            .retain(doc_len - end))
    }

    // ========== Mutators ==========

    /// Append a retain, extending a trailing retain if there is one.
    pub fn add_retain(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_length += n;
        self.target_length += n;

        if let Some(BasicOperation::Retain(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(BasicOperation::Retain(n));
        }
        self
    }

    /// Append an insert, extending a trailing insert if there is one.
    pub fn add_insert(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        self.target_length += text.chars().count();

        if let Some(BasicOperation::Insert(last)) = self.ops.last_mut() {
            last.push_str(text);
        } else {
            self.ops.push(BasicOperation::Insert(text.to_owned()));
        }
        self
    }

    /// Append a delete, extending a trailing delete if there is one.
    pub fn add_delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_length += n;

        if let Some(BasicOperation::Delete(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(BasicOperation::Delete(n));
        }
        self
    }

    /// Builder form of [`add_retain`](Self::add_retain).
    pub fn retain(mut self, n: usize) -> Self {
        self.add_retain(n);
        self
    }

    /// Builder form of [`add_insert`](Self::add_insert).
    pub fn insert(mut self, text: &str) -> Self {
        self.add_insert(text);
        self
    }

    /// Builder form of [`add_delete`](Self::add_delete).
    pub fn delete(mut self, n: usize) -> Self {
        self.add_delete(n);
        self
    }

    fn push(&mut self, op: BasicOperation) {
        match op {
            BasicOperation::Retain(n) => self.add_retain(n),
            BasicOperation::Insert(s) => self.add_insert(&s),
            BasicOperation::Delete(n) => self.add_delete(n),
        };
    }

    fn check_growth(&self, op: &BasicOperation) -> Result<()> {
        let (consumed, produced) = match op {
            BasicOperation::Retain(n) => (*n, *n),
            BasicOperation::Insert(s) => (0, s.chars().count()),
            BasicOperation::Delete(n) => (*n, 0),
        };
        if self.base_length.checked_add(consumed).is_none() {
            return Err(OtError::length_mismatch(
                "base length overflow",
                usize::MAX - self.base_length,
                consumed,
            ));
        }
        if self.target_length.checked_add(produced).is_none() {
            return Err(OtError::length_mismatch(
                "target length overflow",
                usize::MAX - self.target_length,
                produced,
            ));
        }
        Ok(())
    }

    // ========== Queries ==========

    /// The canonical steps, in application order.
    pub fn operations(&self) -> &[BasicOperation] {
        &self.ops
    }

    /// Exact length of any document this operation can be applied to.
    pub fn base_length(&self) -> usize {
        self.base_length
    }

    /// Exact length of the document this operation produces.
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// True when applying the operation leaves every document unchanged.
    pub fn is_noop(&self) -> bool {
        self.ops
            .iter()
            .all(|op| matches!(op, BasicOperation::Retain(_)))
    }

    // ========== Algebra ==========

    /// Apply the operation to `doc`, returning the edited text.
    ///
    /// Fails with [`OtError::LengthMismatch`] if `doc` is not exactly
    /// `base_length` characters long.
    pub fn apply(&self, doc: &str) -> Result<String> {
        let doc_len = doc.chars().count();
        if doc_len != self.base_length {
            return Err(OtError::length_mismatch("apply", self.base_length, doc_len));
        }

        let mut out = String::with_capacity(doc.len());
        let mut chars = doc.chars();
        let mut ind = 0;

        for op in &self.ops {
            match op {
                BasicOperation::Retain(n) => {
                    let mut taken = 0;
                    for ch in chars.by_ref().take(*n) {
                        out.push(ch);
                        taken += 1;
                    }
                    if taken != *n {
                        return Err(OtError::length_mismatch("apply retain", ind + n, doc_len));
                    }
                    ind += n;
                }
                BasicOperation::Insert(s) => out.push_str(s),
                BasicOperation::Delete(n) => {
                    if chars.by_ref().take(*n).count() != *n {
                        return Err(OtError::length_mismatch("apply delete", ind + n, doc_len));
                    }
                    ind += n;
                }
            }
        }

        if ind != doc_len {
            return Err(OtError::length_mismatch("apply", ind, doc_len));
        }
        Ok(out)
    }

    /// The operation undoing `self`, computed against the document `self` was
    /// applied to (not the result).
    ///
    /// ```
    /// use ot_sync::Operation;
    ///
    /// let doc = "hello world";
    /// let op = Operation::delete_at(11, 5, 6).unwrap();
    /// let inverse = op.invert(doc).unwrap();
    /// assert_eq!(inverse.apply(&op.apply(doc).unwrap()).unwrap(), doc);
    /// ```
    pub fn invert(&self, doc: &str) -> Result<Operation> {
        let doc_len = doc.chars().count();
        if doc_len != self.base_length {
            return Err(OtError::length_mismatch("invert", self.base_length, doc_len));
        }

        let mut inverse = Operation::new();
        let mut chars = doc.chars();

        for op in &self.ops {
            match op {
                BasicOperation::Retain(n) => {
                    inverse.add_retain(*n);
                    chars.by_ref().take(*n).for_each(drop);
                }
                BasicOperation::Insert(s) => {
                    inverse.add_delete(s.chars().count());
                }
                BasicOperation::Delete(n) => {
                    let removed: String = chars.by_ref().take(*n).collect();
                    inverse.add_insert(&removed);
                }
            }
        }
        Ok(inverse)
    }

    /// Method form of [`compose`].
    pub fn compose(&self, next: &Operation) -> Result<Operation> {
        compose(self, next)
    }

    /// Method form of [`transform`].
    pub fn transform(&self, concurrent: &Operation) -> Result<(Operation, Operation)> {
        transform(self, concurrent)
    }
}

impl FromIterator<BasicOperation> for Operation {
    fn from_iter<T: IntoIterator<Item = BasicOperation>>(iter: T) -> Self {
        Operation::from_basic_operations(iter)
    }
}

impl TryFrom<Vec<BasicOperation>> for Operation {
    type Error = OtError;

    fn try_from(ops: Vec<BasicOperation>) -> Result<Self> {
        Operation::try_from_basic_operations(ops)
    }
}

impl From<Operation> for Vec<BasicOperation> {
    fn from(operation: Operation) -> Self {
        operation.ops
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) const DOC: &str = "0123456789";

    /// Random document text, multibyte characters included.
    pub(crate) fn arb_document() -> impl Strategy<Value = String> {
        "[a-z0-9é日本 ]{0,40}"
    }

    /// Random canonical operation over a document of `doc_len` chars whose
    /// inserted text is drawn from the `inserts` pattern.
    pub(crate) fn arb_operation(
        doc_len: usize,
        inserts: &'static str,
    ) -> impl Strategy<Value = Operation> {
        prop::collection::vec((0u8..3, 1usize..8, inserts), 0..12).prop_map(move |steps| {
            let mut op = Operation::new();
            let mut remaining = doc_len;
            for (kind, n, text) in steps {
                match kind {
                    0 => {
                        let n = n.min(remaining);
                        op.add_retain(n);
                        remaining -= n;
                    }
                    1 => {
                        op.add_insert(&text);
                    }
                    _ => {
                        let n = n.min(remaining);
                        op.add_delete(n);
                        remaining -= n;
                    }
                }
            }
            op.add_retain(remaining);
            op
        })
    }

    /// A document together with an operation that applies to it.
    pub(crate) fn arb_edit() -> impl Strategy<Value = (String, Operation)> {
        arb_document().prop_flat_map(|doc| {
            let len = doc.chars().count();
            (Just(doc), arb_operation(len, "[a-zé日]{1,5}"))
        })
    }

    /// Build the operation turning [`DOC`] into `target`: digits present in
    /// `target` are kept (they must appear in increasing order), everything
    /// else is inserted.
    pub(crate) fn generate_operation(target: &str) -> Operation {
        let mut op = Operation::new();
        let mut next_kept = 0usize;
        for ch in target.chars() {
            match ch.to_digit(10) {
                Some(digit) => {
                    let digit = digit as usize;
                    op.add_delete(digit - next_kept);
                    op.add_retain(1);
                    next_kept = digit + 1;
                }
                None => {
                    op.add_insert(&ch.to_string());
                }
            }
        }
        op.add_delete(DOC.len() - next_kept);
        op
    }

    #[test]
    fn test_apply_insert_in_middle() {
        let op = Operation::from_basic_operations(vec![
            BasicOperation::Retain(3),
            BasicOperation::Insert("X".into()),
            BasicOperation::Retain(2),
        ]);
        assert_eq!(op.apply("abcde").unwrap(), "abcXde");
    }

    #[test]
    fn test_add_merges_adjacent_kinds() {
        let mut op = Operation::new();
        op.add_retain(2).add_retain(3).add_insert("ab").add_insert("c");
        op.add_delete(1).add_delete(4);

        assert_eq!(
            op.operations(),
            &[
                BasicOperation::Retain(5),
                BasicOperation::Insert("abc".into()),
                BasicOperation::Delete(5),
            ]
        );
        assert_eq!(op.base_length(), 10);
        assert_eq!(op.target_length(), 8);
    }

    #[test]
    fn test_zero_length_additions_are_noops() {
        let op = Operation::new().retain(0).insert("").delete(0);
        assert!(op.operations().is_empty());
        assert_eq!(op.base_length(), 0);
        assert_eq!(op.target_length(), 0);
    }

    #[test]
    fn test_from_basic_operations_canonicalizes() {
        let op = Operation::from_basic_operations(vec![
            BasicOperation::Retain(1),
            BasicOperation::Delete(0),
            BasicOperation::Retain(2),
            BasicOperation::Insert(String::new()),
            BasicOperation::Insert("x".into()),
        ]);
        assert_eq!(
            op.operations(),
            &[BasicOperation::Retain(3), BasicOperation::Insert("x".into())]
        );
        assert!(op.operations().iter().all(|o| !o.is_empty()));
    }

    #[test]
    fn test_lengths_match_contributions() {
        for target in ["", "abc", "01b34h7r8btqwrt9", "0345g78tewer9", "9"] {
            let op = generate_operation(target);
            let mut base = 0;
            let mut out = 0;
            for step in op.operations() {
                match step {
                    BasicOperation::Retain(n) => {
                        base += n;
                        out += n;
                    }
                    BasicOperation::Insert(s) => out += s.chars().count(),
                    BasicOperation::Delete(n) => base += n,
                }
            }
            assert_eq!(op.base_length(), base);
            assert_eq!(op.target_length(), out);
            assert_eq!(op.apply(DOC).unwrap(), target);
        }
    }

    #[test]
    fn test_apply_rejects_wrong_length() {
        let op = Operation::new().retain(3);
        let err = op.apply("ab").unwrap_err();
        assert!(matches!(
            err,
            OtError::LengthMismatch {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_apply_counts_chars_not_bytes() {
        let op = Operation::insert_at(3, 1, "é").unwrap();
        assert_eq!(op.apply("日本語").unwrap(), "日é本語");
        assert_eq!(op.target_length(), 4);
    }

    #[test]
    fn test_invert_round_trip() {
        for target in ["", "abc", "01b34h7r8btqwrt9", "ytr0pok1fr2fgtw3tt5yy9qweryf", DOC] {
            let op = generate_operation(target);
            let edited = op.apply(DOC).unwrap();
            let inverse = op.invert(DOC).unwrap();
            assert_eq!(inverse.apply(&edited).unwrap(), DOC);
            assert_eq!(inverse.base_length(), op.target_length());
            assert_eq!(inverse.target_length(), op.base_length());
        }
    }

    #[test]
    fn test_invert_does_not_mutate() {
        let op = generate_operation("0a2b4");
        let before = op.clone();
        let _ = op.invert(DOC).unwrap();
        assert_eq!(op, before);
    }

    #[test]
    fn test_positional_constructors() {
        assert_eq!(
            Operation::insert_at(4, 3, "456").unwrap().apply("0123").unwrap(),
            "0124563"
        );
        assert_eq!(
            Operation::delete_at(4, 1, 3).unwrap().apply("0123").unwrap(),
            "0"
        );
        assert!(Operation::insert_at(4, 5, "x").is_err());
        assert!(Operation::delete_at(4, 2, 3).is_err());
    }

    #[test]
    fn test_is_noop() {
        assert!(Operation::new().is_noop());
        assert!(Operation::new().retain(4).is_noop());
        assert!(!Operation::insert_at(0, 0, "a").unwrap().is_noop());
    }

    proptest! {
        #[test]
        fn prop_lengths_match_contributions((doc, op) in arb_edit()) {
            let mut base = 0;
            let mut out = 0;
            for step in op.operations() {
                match step {
                    BasicOperation::Retain(n) => {
                        base += n;
                        out += n;
                    }
                    BasicOperation::Insert(s) => out += s.chars().count(),
                    BasicOperation::Delete(n) => base += n,
                }
            }
            prop_assert_eq!(op.base_length(), base);
            prop_assert_eq!(op.target_length(), out);
            prop_assert_eq!(op.base_length(), doc.chars().count());
        }

        #[test]
        fn prop_operations_stay_canonical((_doc, op) in arb_edit()) {
            prop_assert!(op.operations().iter().all(|step| !step.is_empty()));
            for pair in op.operations().windows(2) {
                prop_assert_ne!(
                    std::mem::discriminant(&pair[0]),
                    std::mem::discriminant(&pair[1])
                );
            }
        }

        #[test]
        fn prop_apply_produces_target_length((doc, op) in arb_edit()) {
            let edited = op.apply(&doc).unwrap();
            prop_assert_eq!(edited.chars().count(), op.target_length());
        }

        #[test]
        fn prop_invert_round_trip((doc, op) in arb_edit()) {
            let before = op.clone();
            let edited = op.apply(&doc).unwrap();
            let inverse = op.invert(&doc).unwrap();
            prop_assert_eq!(inverse.apply(&edited).unwrap(), doc);
            prop_assert_eq!(inverse.base_length(), op.target_length());
            prop_assert_eq!(inverse.target_length(), op.base_length());
            prop_assert_eq!(op, before);
        }
    }
}
