//! The authoritative replica.

use super::config::ServerConfig;
use super::transport::ServerTransport;
use crate::error::{OtError, Result};
use crate::operation::{transform, Operation};
use crate::types::{Revision, SessionId, Snapshot};
use tracing::{debug, trace, warn};

/// The single serialization point for all submissions.
///
/// Holds the authoritative document and the append-only history of every
/// committed operation; `history[r]` is the operation that took the document
/// from revision `r` to `r + 1`.
///
/// # Thread Safety
///
/// [`receive_operation`](Self::receive_operation) takes `&mut self`, so
/// submissions are serialized by the borrow checker. To share a server
/// between tasks, wrap it in a lock; [`SharedServer`](super::SharedServer)
/// does so with a `parking_lot::Mutex`.
#[derive(Debug)]
pub struct Server<T> {
    document: String,
    history: Vec<Operation>,
    transport: T,
    config: ServerConfig,
}

impl<T: ServerTransport> Server<T> {
    /// An empty server at revision 0.
    pub fn new(transport: T) -> Self {
        Self::with_config(ServerConfig::default(), transport)
    }

    /// A server at revision 0 holding `config.initial_document`.
    pub fn with_config(config: ServerConfig, transport: T) -> Self {
        Server {
            document: config.initial_document.clone(),
            history: Vec::new(),
            transport,
            config,
        }
    }

    /// Commit an operation computed by `sender` against `from_revision`.
    ///
    /// The operation is transformed against every operation committed since
    /// `from_revision`, in commit order, then applied and appended to the
    /// history. The sender is acknowledged and every other session receives
    /// the transformed operation. Returns the new revision.
    ///
    /// Nothing is modified or sent when this fails.
    pub fn receive_operation(
        &mut self,
        operation: Operation,
        from_revision: Revision,
        sender: &SessionId,
    ) -> Result<Revision> {
        let revision = self.revision();
        if from_revision > revision {
            if self.config.enable_logging {
                warn!(%sender, from_revision, revision, "submission from the future");
            }
            return Err(OtError::ProtocolViolation(format!(
                "operation from revision {from_revision} but server is at {revision}"
            )));
        }

        let mut transformed = operation;
        for (offset, committed) in self.history[from_revision..].iter().enumerate() {
            trace!(%sender, against = from_revision + offset, "transforming past committed operation");
            transformed = transform(&transformed, committed)?.0;
        }

        self.document = transformed.apply(&self.document)?;
        self.history.push(transformed);
        debug!(
            %sender,
            from_revision,
            revision = self.history.len(),
            length = self.document.chars().count(),
            "committed operation"
        );

        self.transport.send_ack(sender);
        if let Some(committed) = self.history.last() {
            self.transport.send_operation_except(committed, sender);
        }
        Ok(self.history.len())
    }
}

impl<T> Server<T> {
    /// Number of committed operations.
    pub fn revision(&self) -> Revision {
        self.history.len()
    }

    /// Current authoritative text.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Every committed operation, in commit order.
    pub fn history(&self) -> &[Operation] {
        &self.history
    }

    /// Operations committed after `revision`, for catching a replica up.
    pub fn operations_since(&self, revision: Revision) -> Result<&[Operation]> {
        self.history.get(revision..).ok_or_else(|| {
            OtError::ProtocolViolation(format!(
                "revision {revision} is ahead of server revision {}",
                self.history.len()
            ))
        })
    }

    /// Current document and revision, for starting or resetting a client.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.document.clone(), self.revision())
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The injected transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The injected transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
