use super::cursor::{Cursor, Head};
use super::Operation;
use crate::error::{OtError, Result};

/// Reconcile two concurrent operations computed against the same document.
///
/// Returns `(a', b')` such that applying `a` then `b'` reaches the same text
/// as applying `b` then `a'`. Both operands must share a base length,
/// otherwise [`OtError::LengthMismatch`] is returned.
///
/// Resolution rules at each step:
///
/// | `a` head | `b` head | `a'` gets | `b'` gets |
/// |----------|----------|-----------|-----------|
/// | insert | insert | the lexicographically smaller insert goes first ||
/// | insert | any | the insert | retain over it |
/// | any | insert | retain over it | the insert |
/// | retain | retain | retain | retain |
/// | delete | delete | nothing | nothing |
/// | retain | delete | nothing | delete |
/// | delete | retain | delete | nothing |
///
/// Because concurrent inserts at the same spot are ordered by their text, the
/// result does not depend on argument order:
/// `transform(a, b) == swap(transform(b, a))` whenever the two inserted texts
/// differ.
pub fn transform(a: &Operation, b: &Operation) -> Result<(Operation, Operation)> {
    if a.base_length() != b.base_length() {
        return Err(OtError::length_mismatch(
            "transform",
            a.base_length(),
            b.base_length(),
        ));
    }

    let mut a_prime = Operation::new();
    let mut b_prime = Operation::new();
    let mut left = Cursor::new(a);
    let mut right = Cursor::new(b);

    loop {
        match (left.head(), right.head()) {
            (None, None) => break,

            (Some(Head::Insert(x, x_len)), Some(Head::Insert(y, y_len))) => {
                if x < y {
                    a_prime.add_insert(x);
                    b_prime.add_retain(x_len);
                    left.take_all();
                } else {
                    a_prime.add_retain(y_len);
                    b_prime.add_insert(y);
                    right.take_all();
                }
            }
            (Some(Head::Insert(x, x_len)), _) => {
                a_prime.add_insert(x);
                b_prime.add_retain(x_len);
                left.take_all();
            }
            (_, Some(Head::Insert(y, y_len))) => {
                a_prime.add_retain(y_len);
                b_prime.add_insert(y);
                right.take_all();
            }

            (Some(Head::Retain(x)), Some(Head::Retain(y))) => {
                let n = x.min(y);
                a_prime.add_retain(n);
                b_prime.add_retain(n);
                left.take(n);
                right.take(n);
            }
            // Already gone on both sides.
            (Some(Head::Delete(x)), Some(Head::Delete(y))) => {
                let n = x.min(y);
                left.take(n);
                right.take(n);
            }
            (Some(Head::Retain(x)), Some(Head::Delete(y))) => {
                let n = x.min(y);
                b_prime.add_delete(n);
                left.take(n);
                right.take(n);
            }
            (Some(Head::Delete(x)), Some(Head::Retain(y))) => {
                let n = x.min(y);
                a_prime.add_delete(n);
                left.take(n);
                right.take(n);
            }

            (l, r) => {
                return Err(OtError::UnknownOperationKind(format!(
                    "transform heads out of step: {l:?} / {r:?}"
                )));
            }
        }
    }

    Ok((a_prime, b_prime))
}
