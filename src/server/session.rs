//! Shared, thread-safe server with in-process channel sessions.
//!
//! [`SharedServer`] wraps a [`Server`] in `Arc<Mutex<..>>` so that every
//! submission runs as one critical section: the history scan, the apply, the
//! append and the ack/broadcast all happen under the lock, and no submission
//! can observe a half-appended history.
//!
//! Clients talk to it through unbounded `tokio` channels:
//!
//! ```text
//!  Connection ──submit──▶ Inbox (mpsc, FIFO) ──▶ SharedServer::handle
//!      ▲                                              │
//!      └──── ack / broadcast (per-session mpsc) ◀─────┘  SessionRegistry
//! ```

use super::config::ServerConfig;
use super::synchronizer::Server;
use super::transport::ServerTransport;
use crate::client::{ClientConfig, Connection};
use crate::error::{OtError, Result};
use crate::operation::Operation;
use crate::protocol::Message;
use crate::types::{Revision, SessionId, Snapshot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

/// Outbound queues of every connected session.
///
/// Sessions whose receiving end has been dropped are pruned the next time a
/// send to them fails.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, mpsc::UnboundedSender<Message>>,
    enable_logging: bool,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(enable_logging: bool) -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
            enable_logging,
        }
    }

    /// Register (or replace) the outbound queue for `session_id`.
    pub fn register(&mut self, session_id: SessionId, sender: mpsc::UnboundedSender<Message>) {
        if self.sessions.insert(session_id.clone(), sender).is_some() && self.enable_logging {
            warn!(session = %session_id, "session re-registered, previous queue replaced");
        }
    }

    /// Forget `session_id`. Returns whether it was registered.
    pub fn unregister(&mut self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Whether `session_id` is registered.
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All registered session ids, in arbitrary order.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().cloned().collect()
    }
}

impl ServerTransport for SessionRegistry {
    fn send_ack(&mut self, session_id: &SessionId) {
        let delivered = match self.sessions.get(session_id) {
            Some(sender) => sender.send(Message::ack(session_id.clone())).is_ok(),
            None => false,
        };
        if !delivered {
            if self.enable_logging {
                warn!(session = %session_id, "acknowledgement for closed or unknown session");
            }
            self.sessions.remove(session_id);
        }
    }

    fn send_operation_except(&mut self, operation: &Operation, session_id: &SessionId) {
        let enable_logging = self.enable_logging;
        self.sessions.retain(|id, sender| {
            if id == session_id {
                return true;
            }
            let delivered = sender
                .send(Message::broadcast(operation.clone(), id.clone()))
                .is_ok();
            if !delivered && enable_logging {
                warn!(session = %id, "dropping closed session");
            }
            delivered
        });
    }
}

/// Cloneable handle to one authoritative server.
///
/// ```
/// use ot_sync::client::ClientConfig;
/// use ot_sync::server::{ServerConfig, SharedServer};
/// use ot_sync::Operation;
///
/// let (server, mut inbox) = SharedServer::new(ServerConfig::default());
/// let mut alice = server.connect(ClientConfig::default());
/// let mut bob = server.connect(ClientConfig::default());
///
/// alice.edit(Operation::insert_at(0, 0, "hi").unwrap()).unwrap();
/// inbox.process_pending().unwrap();
/// alice.drain().unwrap();
/// bob.drain().unwrap();
///
/// assert_eq!(bob.document(), "hi");
/// assert_eq!(server.revision(), 1);
/// ```
#[derive(Clone)]
pub struct SharedServer {
    inner: Arc<Mutex<Server<SessionRegistry>>>,
    submissions: mpsc::UnboundedSender<Message>,
}

impl SharedServer {
    /// Create a server and the inbox its connections submit to.
    ///
    /// The inbox must be driven (with [`Inbox::run`] or
    /// [`Inbox::process_pending`]) for submissions to be committed.
    pub fn new(config: ServerConfig) -> (Self, Inbox) {
        let registry = SessionRegistry::new(config.enable_logging);
        let (submissions, receiver) = mpsc::unbounded_channel();
        let server = SharedServer {
            inner: Arc::new(Mutex::new(Server::with_config(config, registry))),
            submissions,
        };
        let inbox = Inbox {
            receiver,
            server: Arc::clone(&server.inner),
        };
        (server, inbox)
    }

    /// Open a new session starting from the current snapshot.
    ///
    /// Registration and the snapshot happen under the server lock, so the
    /// new client sees every later commit exactly once.
    pub fn connect(&self, mut config: ClientConfig) -> Connection {
        let session_id = config
            .session_id
            .clone()
            .map(SessionId::from)
            .unwrap_or_else(SessionId::random);
        config.session_id = Some(session_id.to_string());
        let (to_client, from_server) = mpsc::unbounded_channel();

        let snapshot = {
            let mut server = self.inner.lock();
            server.transport_mut().register(session_id.clone(), to_client);
            server.snapshot()
        };
        info!(session = %session_id, revision = snapshot.revision, "session connected");

        Connection::new(
            session_id,
            config,
            snapshot,
            self.submissions.clone(),
            from_server,
        )
    }

    /// Close a session; it receives no further messages.
    pub fn disconnect(&self, session_id: &SessionId) -> bool {
        let removed = self.inner.lock().transport_mut().unregister(session_id);
        if removed {
            info!(session = %session_id, "session disconnected");
        }
        removed
    }

    /// Commit a submission (see [`Server::receive_operation`]) under the lock.
    pub fn receive_operation(
        &self,
        operation: Operation,
        from_revision: Revision,
        sender: &SessionId,
    ) -> Result<Revision> {
        self.inner
            .lock()
            .receive_operation(operation, from_revision, sender)
    }

    /// Handle one inbound message.
    ///
    /// Only operation submissions that carry both a revision and a session id
    /// are accepted.
    pub fn handle(&self, message: Message) -> Result<Revision> {
        handle_submission(&self.inner, message)
    }

    /// Current document and revision.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().snapshot()
    }

    /// Current authoritative text.
    pub fn document(&self) -> String {
        self.inner.lock().document().to_owned()
    }

    /// Number of committed operations.
    pub fn revision(&self) -> Revision {
        self.inner.lock().revision()
    }

    /// Operations committed after `revision`.
    pub fn operations_since(&self, revision: Revision) -> Result<Vec<Operation>> {
        self.inner
            .lock()
            .operations_since(revision)
            .map(<[Operation]>::to_vec)
    }

    /// Ids of the currently connected sessions.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.inner.lock().transport().session_ids()
    }
}

fn handle_submission(server: &Mutex<Server<SessionRegistry>>, message: Message) -> Result<Revision> {
    match message {
        Message::Operation {
            operation,
            revision: Some(revision),
            session_id: Some(sender),
        } => server.lock().receive_operation(operation, revision, &sender),
        Message::Operation { .. } => Err(OtError::ProtocolViolation(
            "submission without revision or session id".into(),
        )),
        Message::Acknowledge { .. } => Err(OtError::ProtocolViolation(
            "clients do not send acknowledgements".into(),
        )),
    }
}

/// Inbound submission queue of a [`SharedServer`].
///
/// Submissions from all connections are committed strictly in arrival order.
pub struct Inbox {
    receiver: mpsc::UnboundedReceiver<Message>,
    server: Arc<Mutex<Server<SessionRegistry>>>,
}

impl Inbox {
    /// Commit submissions until every [`SharedServer`] handle and every
    /// [`Connection`] is dropped.
    ///
    /// Rejected submissions are logged and skipped; the submitting client will
    /// never be acknowledged and is expected to resynchronize.
    pub async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            self.commit(message);
        }
        debug!("server inbox closed");
    }

    /// Commit the next submission, waiting for one to arrive.
    ///
    /// Returns `None` once nothing can submit any more.
    pub async fn process_next(&mut self) -> Option<Result<Revision>> {
        let message = self.receiver.recv().await?;
        Some(handle_submission(&self.server, message))
    }

    /// Commit every queued submission without waiting, returning how many
    /// were committed.
    ///
    /// Stops at the first rejected submission.
    pub fn process_pending(&mut self) -> Result<usize> {
        let mut committed = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    handle_submission(&self.server, message)?;
                    committed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    return Ok(committed)
                }
            }
        }
    }

    /// Commit exactly one queued submission, if there is one.
    pub fn process_one(&mut self) -> Option<Result<Revision>> {
        self.receiver
            .try_recv()
            .ok()
            .map(|message| handle_submission(&self.server, message))
    }

    /// Turn the inbox into a stream of commit results, one per submission.
    ///
    /// Useful when the caller wants to observe every commit or rejection
    /// instead of having [`run`](Self::run) log them.
    pub fn into_stream(self) -> impl Stream<Item = Result<Revision>> + Unpin + Send {
        let server = self.server;
        UnboundedReceiverStream::new(self.receiver)
            .map(move |message| handle_submission(&server, message))
    }

    fn commit(&self, message: Message) {
        let sender = message.session_id().cloned();
        match handle_submission(&self.server, message) {
            Ok(_) => {}
            Err(err) if err.requires_resync() => {
                warn!(
                    session = ?sender,
                    %err,
                    fatal = err.is_fatal(),
                    "rejected submission, client must resynchronize"
                );
            }
            Err(err) => debug!(session = ?sender, %err, "dropped submission"),
        }
    }
}
