use super::cursor::{split_chars, Cursor, Head};
use super::Operation;
use crate::error::{OtError, Result};

/// Merge two sequential operations into one.
///
/// `b` must have been computed against the output of `a`
/// (`a.target_length() == b.base_length()`), otherwise
/// [`OtError::LengthMismatch`] is returned. The result satisfies
/// `apply(compose(a, b), doc) == apply(b, apply(a, doc))`.
///
/// Neither argument is modified. Runs in time linear in the number of entries.
///
/// ```
/// use ot_sync::operation::compose;
/// use ot_sync::Operation;
///
/// let a = Operation::insert_at(0, 0, "hello").unwrap();
/// let b = Operation::insert_at(5, 5, " world").unwrap();
/// let ab = compose(&a, &b).unwrap();
/// assert_eq!(ab.apply("").unwrap(), "hello world");
/// ```
pub fn compose(a: &Operation, b: &Operation) -> Result<Operation> {
    if a.target_length() != b.base_length() {
        return Err(OtError::length_mismatch(
            "compose",
            a.target_length(),
            b.base_length(),
        ));
    }

    let mut composed = Operation::new();
    let mut first = Cursor::new(a);
    let mut second = Cursor::new(b);

    loop {
        match (first.head(), second.head()) {
            (None, None) => break,

            // Text deleted by `a` never reaches `b`.
            (Some(Head::Delete(n)), _) => {
                composed.add_delete(n);
                first.take_all();
            }
            // Text inserted by `b` never existed for `a`.
            (_, Some(Head::Insert(text, _))) => {
                composed.add_insert(text);
                second.take_all();
            }

            (Some(Head::Retain(x)), Some(Head::Retain(y))) => {
                let n = x.min(y);
                composed.add_retain(n);
                first.take(n);
                second.take(n);
            }
            (Some(Head::Retain(x)), Some(Head::Delete(y))) => {
                let n = x.min(y);
                composed.add_delete(n);
                first.take(n);
                second.take(n);
            }
            (Some(Head::Insert(text, len)), Some(Head::Retain(y))) => {
                let n = len.min(y);
                composed.add_insert(split_chars(text, n).0);
                first.take(n);
                second.take(n);
            }
            // `b` deletes what `a` inserted: both vanish.
            (Some(Head::Insert(_, len)), Some(Head::Delete(y))) => {
                let n = len.min(y);
                first.take(n);
                second.take(n);
            }

            (left, right) => {
                return Err(OtError::UnknownOperationKind(format!(
                    "compose heads out of step: {left:?} / {right:?}"
                )));
            }
        }
    }

    Ok(composed)
}
