//! Shared protocol types.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Revision`] | Number of operations an endpoint has incorporated |
//! | [`SessionId`] | Identifies one client connection on the server |
//! | [`Snapshot`] | Document plus revision, used to (re)start a replica |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Count of operations an endpoint has incorporated.
///
/// On the server this is also the length of the history; an operation
/// submitted "from revision r" was computed against the document produced by
/// the first `r` history entries.
pub type Revision = usize;

/// Identifier of one client session as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session id from any string.
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    /// Generate a fresh random session id.
    pub fn random() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId::new(s)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

/// A consistent view of an authoritative replica.
///
/// Produced by [`Server::snapshot`](crate::Server::snapshot) and consumed by
/// [`Client::from_snapshot`](crate::Client::from_snapshot) /
/// [`Client::reset`](crate::Client::reset).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Full document text
    pub document: String,
    /// Revision the document corresponds to
    pub revision: Revision,
}

impl Snapshot {
    /// Create a snapshot.
    pub fn new(document: impl Into<String>, revision: Revision) -> Self {
        Snapshot {
            document: document.into(),
            revision,
        }
    }
}
