//! The Jupiter client state machine.
//!
//! ```text
//!                 local edit                       local edit
//!  Synchronized ─────────────▶ AwaitingAck ───────────────────▶ AwaitingAckBuffered
//!       ▲                          │  ▲                                │   ▲  │
//!       └──────── ack ─────────────┘  └──── ack (send buffer) ─────────┘   └──┘
//!                                                                   local edit (compose)
//! ```
//!
//! Remote operations never change the state; they are transformed past the
//! in-flight and buffered operations before being applied.

use super::config::ClientConfig;
use super::transport::ClientTransport;
use crate::error::{OtError, Result};
use crate::operation::{compose, transform, Operation};
use crate::types::{Revision, Snapshot};
use tracing::{debug, warn};

/// Which protocol state a [`Client`] is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientStateKind {
    /// Nothing in flight
    Synchronized,
    /// One operation sent, not yet acknowledged
    AwaitingAck,
    /// One operation in flight plus local edits buffered behind it
    AwaitingAckBuffered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClientState {
    Synchronized,
    AwaitingAck {
        awaiting: Operation,
    },
    AwaitingAckBuffered {
        awaiting: Operation,
        buffer: Operation,
    },
}

/// One replica of the shared document.
///
/// At most one operation is ever in flight to the server; further local edits
/// are composed into a single buffered operation that is sent when the
/// in-flight one is acknowledged. The server therefore only has to transform a
/// submission against operations committed after the revision it names.
///
/// Every transition validates before it mutates: on `Err` the client is left
/// exactly as it was.
///
/// Delivery must be serialized per client: each of [`apply_client`],
/// [`apply_server`] and [`ack_operation`] takes `&mut self`, and the transport
/// must preserve the server's send order.
///
/// [`apply_client`]: Client::apply_client
/// [`apply_server`]: Client::apply_server
/// [`ack_operation`]: Client::ack_operation
///
/// # Examples
///
/// ```
/// use ot_sync::{Client, ClientTransport, Operation, Revision};
///
/// #[derive(Default)]
/// struct Outbox(Vec<(Operation, Revision)>);
///
/// impl ClientTransport for Outbox {
///     fn send_operation(&mut self, operation: &Operation, revision: Revision) {
///         self.0.push((operation.clone(), revision));
///     }
/// }
///
/// let mut client = Client::new(Outbox::default());
/// client.apply_client(Operation::insert_at(0, 0, "hi").unwrap()).unwrap();
/// assert_eq!(client.document(), "hi");
/// assert_eq!(client.transport().0.len(), 1);
///
/// client.ack_operation().unwrap();
/// assert!(client.ack_operation().is_err());
/// ```
#[derive(Debug)]
pub struct Client<T> {
    revision: Revision,
    document: String,
    state: ClientState,
    transport: T,
    config: ClientConfig,
}

impl<T: ClientTransport> Client<T> {
    /// A synchronized client at revision 0 with an empty document.
    pub fn new(transport: T) -> Self {
        Self::with_config(ClientConfig::default(), Snapshot::default(), transport)
    }

    /// A synchronized client starting from a server snapshot.
    pub fn from_snapshot(snapshot: Snapshot, transport: T) -> Self {
        Self::with_config(ClientConfig::default(), snapshot, transport)
    }

    /// A synchronized client with explicit configuration.
    pub fn with_config(config: ClientConfig, snapshot: Snapshot, transport: T) -> Self {
        Client {
            revision: snapshot.revision,
            document: snapshot.document,
            state: ClientState::Synchronized,
            transport,
            config,
        }
    }

    // ========== Transitions ==========

    /// Apply a local edit and, if nothing is in flight, send it.
    ///
    /// `operation` must be based on the current [`document`](Self::document).
    pub fn apply_client(&mut self, operation: Operation) -> Result<()> {
        let document = operation.apply(&self.document)?;

        match &mut self.state {
            ClientState::Synchronized => {
                self.document = document;
                self.revision += 1;
                self.transport.send_operation(&operation, self.revision - 1);
                self.state = ClientState::AwaitingAck {
                    awaiting: operation,
                };
            }
            ClientState::AwaitingAck { awaiting } => {
                let awaiting = std::mem::take(awaiting);
                self.document = document;
                self.revision += 1;
                self.state = ClientState::AwaitingAckBuffered {
                    awaiting,
                    buffer: operation,
                };
            }
            ClientState::AwaitingAckBuffered { buffer, .. } => {
                let composed = compose(buffer, &operation)?;
                *buffer = composed;
                self.document = document;
            }
        }

        debug!(
            session = ?self.config.session_id,
            revision = self.revision,
            state = ?self.state(),
            "applied local operation"
        );
        Ok(())
    }

    /// Apply an operation broadcast by the server.
    ///
    /// The operation is based on the last server revision this client has
    /// seen, so it is transformed past the in-flight and buffered operations
    /// first; those are transformed in turn so they stay valid on top of it.
    pub fn apply_server(&mut self, operation: Operation) -> Result<()> {
        match &mut self.state {
            ClientState::Synchronized => {
                self.document = operation.apply(&self.document)?;
            }
            ClientState::AwaitingAck { awaiting } => {
                let (remote, awaiting_prime) = transform(&operation, awaiting)?;
                let document = remote.apply(&self.document)?;
                *awaiting = awaiting_prime;
                self.document = document;
            }
            ClientState::AwaitingAckBuffered { awaiting, buffer } => {
                let (remote, awaiting_prime) = transform(&operation, awaiting)?;
                let (remote, buffer_prime) = transform(&remote, buffer)?;
                let document = remote.apply(&self.document)?;
                *awaiting = awaiting_prime;
                *buffer = buffer_prime;
                self.document = document;
            }
        }
        self.revision += 1;

        debug!(
            session = ?self.config.session_id,
            revision = self.revision,
            state = ?self.state(),
            "applied server operation"
        );
        Ok(())
    }

    /// Handle the server's acknowledgement of the in-flight operation.
    ///
    /// Sends the buffered operation, if any. Fails with
    /// [`OtError::ProtocolViolation`] when nothing is in flight.
    pub fn ack_operation(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, ClientState::Synchronized) {
            ClientState::Synchronized => {
                if self.config.enable_logging {
                    warn!(session = ?self.config.session_id, "acknowledgement while synchronized");
                }
                return Err(OtError::ProtocolViolation(
                    "acknowledgement received while synchronized".into(),
                ));
            }
            ClientState::AwaitingAck { .. } => {}
            ClientState::AwaitingAckBuffered { buffer, .. } => {
                self.transport.send_operation(&buffer, self.revision - 1);
                self.state = ClientState::AwaitingAck { awaiting: buffer };
            }
        }

        debug!(
            session = ?self.config.session_id,
            revision = self.revision,
            state = ?self.state(),
            "operation acknowledged"
        );
        Ok(())
    }

    /// Drop all pending work and restart from `snapshot`.
    ///
    /// Used to recover after a fatal error; local edits not yet acknowledged
    /// are lost.
    pub fn reset(&mut self, snapshot: Snapshot) {
        if self.config.enable_logging && self.state != ClientState::Synchronized {
            warn!(
                session = ?self.config.session_id,
                revision = snapshot.revision,
                "resetting client with unacknowledged edits"
            );
        }
        self.revision = snapshot.revision;
        self.document = snapshot.document;
        self.state = ClientState::Synchronized;
    }
}

impl<T> Client<T> {
    // ========== Queries ==========

    /// Operations incorporated so far (server-confirmed or locally applied).
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Current local text, including unacknowledged edits.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Current protocol state.
    pub fn state(&self) -> ClientStateKind {
        match self.state {
            ClientState::Synchronized => ClientStateKind::Synchronized,
            ClientState::AwaitingAck { .. } => ClientStateKind::AwaitingAck,
            ClientState::AwaitingAckBuffered { .. } => ClientStateKind::AwaitingAckBuffered,
        }
    }

    /// The operation sent but not yet acknowledged.
    pub fn await_operation(&self) -> Option<&Operation> {
        match &self.state {
            ClientState::Synchronized => None,
            ClientState::AwaitingAck { awaiting }
            | ClientState::AwaitingAckBuffered { awaiting, .. } => Some(awaiting),
        }
    }

    /// Local edits accumulated behind the in-flight operation.
    pub fn buffered_operation(&self) -> Option<&Operation> {
        match &self.state {
            ClientState::AwaitingAckBuffered { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
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
