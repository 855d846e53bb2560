//! Error types for the OT engine and its synchronization protocol.
//!
//! Every fallible entry point in this crate returns [`Result`]. The three core
//! kinds ([`OtError::LengthMismatch`], [`OtError::UnknownOperationKind`] and
//! [`OtError::ProtocolViolation`]) always indicate a bug or corrupted state on
//! one of the endpoints. The engine never retries; the caller decides whether to
//! drop the connection, resynchronize from a [`Snapshot`](crate::Snapshot), or
//! surface the failure to the user.
//!
//! State-machine transitions validate everything up front, so when an error is
//! returned the client or server it came from is exactly as it was before the
//! call.

use thiserror::Error;

/// Result type alias for OT operations.
pub type Result<T> = std::result::Result<T, OtError>;

/// Errors raised by the operation algebra, the client state machine, the
/// server synchronizer and the wire codec.
#[derive(Debug, Error)]
pub enum OtError {
    /// An operation's base/target length disagrees with the document it is
    /// applied to or with the operation it is combined with.
    #[error("length mismatch in {context}: expected {expected}, found {found}")]
    LengthMismatch {
        /// Which check failed
        context: &'static str,
        /// Length required by the operation
        expected: usize,
        /// Length actually observed
        found: usize,
    },

    /// A basic operation outside {retain, insert, delete} reached the algebra,
    /// or two operations ran out of entries at different points.
    #[error("unknown operation kind: {0}")]
    UnknownOperationKind(String),

    /// A message arrived that the protocol state does not allow, e.g. an
    /// acknowledgement while synchronized.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Malformed wire data.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The other end of an in-process channel has gone away.
    #[error("disconnected: {0}")]
    Disconnected(String),
}

impl OtError {
    pub(crate) fn length_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        OtError::LengthMismatch {
            context,
            expected,
            found,
        }
    }

    /// Check if this error is one of the core invariant violations.
    ///
    /// Fatal errors mean the endpoint's view of the document can no longer be
    /// trusted for the operation in progress.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OtError::LengthMismatch { .. }
                | OtError::UnknownOperationKind(_)
                | OtError::ProtocolViolation(_)
        )
    }

    /// Check if recovering from this error requires a fresh snapshot.
    ///
    /// Only codec errors leave the replica untouched and in sync; the offending
    /// frame can be dropped on its own.
    pub fn requires_resync(&self) -> bool {
        !matches!(self, OtError::Codec(_))
    }
}
