//! In-process connection between a [`Client`] and a
//! [`SharedServer`](crate::server::SharedServer).
//!
//! Messages travel over unbounded `tokio` channels, which preserve send order
//! per direction as the protocol requires. A [`Connection`] is obtained from
//! [`SharedServer::connect`](crate::server::SharedServer::connect) and is
//! driven either by awaiting [`Connection::recv`], by polling it as a
//! [`Stream`], or synchronously with [`Connection::try_recv`].
//!
//! # Examples
//!
//! ```
//! use ot_sync::client::ClientConfig;
//! use ot_sync::server::{ServerConfig, SharedServer};
//! use ot_sync::Operation;
//!
//! # tokio_test::block_on(async {
//! let (server, mut inbox) = SharedServer::new(ServerConfig::default());
//! let mut alice = server.connect(ClientConfig::default());
//!
//! alice.edit(Operation::insert_at(0, 0, "hello").unwrap()).unwrap();
//! inbox.process_pending().unwrap();
//! alice.recv().await.unwrap().unwrap(); // acknowledgement
//!
//! assert_eq!(server.document(), "hello");
//! # });
//! ```

use super::config::ClientConfig;
use super::state::Client;
use super::transport::ClientTransport;
use crate::error::{OtError, Result};
use crate::operation::Operation;
use crate::protocol::Message;
use crate::types::{Revision, SessionId, Snapshot};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::warn;

/// [`ClientTransport`] pushing submissions into the server's inbound queue.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    session_id: SessionId,
    outbound: mpsc::UnboundedSender<Message>,
    enable_logging: bool,
}

impl ChannelTransport {
    pub(crate) fn new(
        session_id: SessionId,
        outbound: mpsc::UnboundedSender<Message>,
        enable_logging: bool,
    ) -> Self {
        ChannelTransport {
            session_id,
            outbound,
            enable_logging,
        }
    }
}

impl ClientTransport for ChannelTransport {
    fn send_operation(&mut self, operation: &Operation, revision: Revision) {
        let message = Message::Operation {
            operation: operation.clone(),
            revision: Some(revision),
            session_id: Some(self.session_id.clone()),
        };
        if self.outbound.send(message).is_err() && self.enable_logging {
            warn!(session = %self.session_id, revision, "server inbox closed, operation dropped");
        }
    }
}

/// A client replica wired to an in-process server.
pub struct Connection {
    session_id: SessionId,
    client: Client<ChannelTransport>,
    inbound: mpsc::UnboundedReceiver<Message>,
}

impl Connection {
    pub(crate) fn new(
        session_id: SessionId,
        config: ClientConfig,
        snapshot: Snapshot,
        outbound: mpsc::UnboundedSender<Message>,
        inbound: mpsc::UnboundedReceiver<Message>,
    ) -> Self {
        let transport = ChannelTransport::new(session_id.clone(), outbound, config.enable_logging);
        Connection {
            session_id,
            client: Client::with_config(config, snapshot, transport),
            inbound,
        }
    }

    /// This connection's session id on the server.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The underlying client replica.
    pub fn client(&self) -> &Client<ChannelTransport> {
        &self.client
    }

    /// Current local text.
    pub fn document(&self) -> &str {
        self.client.document()
    }

    /// Apply a local edit (see [`Client::apply_client`]).
    pub fn edit(&mut self, operation: Operation) -> Result<()> {
        self.client.apply_client(operation)
    }

    /// Route one server message into the client.
    ///
    /// Messages addressed to another session are rejected with
    /// [`OtError::ProtocolViolation`].
    pub fn dispatch(&mut self, message: Message) -> Result<()> {
        if let Some(addressee) = message.session_id() {
            if *addressee != self.session_id {
                return Err(OtError::ProtocolViolation(format!(
                    "message for {addressee} delivered to {}",
                    self.session_id
                )));
            }
        }
        match message {
            Message::Acknowledge { .. } => self.client.ack_operation(),
            Message::Operation { operation, .. } => self.client.apply_server(operation),
        }
    }

    /// Wait for the next server message and dispatch it.
    ///
    /// Returns the message that was handled, or `None` once the server has
    /// dropped this session.
    pub async fn recv(&mut self) -> Option<Result<Message>> {
        let message = self.inbound.recv().await?;
        Some(self.dispatch(message.clone()).map(|()| message))
    }

    /// Dispatch the next queued message without waiting.
    ///
    /// Returns `None` when the queue is currently empty.
    pub fn try_recv(&mut self) -> Option<Result<Message>> {
        match self.inbound.try_recv() {
            Ok(message) => Some(self.dispatch(message.clone()).map(|()| message)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(OtError::Disconnected(format!(
                "server dropped session {}",
                self.session_id
            )))),
        }
    }

    /// Dispatch every queued message, returning how many were handled.
    pub fn drain(&mut self) -> Result<usize> {
        let mut handled = 0;
        loop {
            match self.inbound.try_recv() {
                Ok(message) => {
                    self.dispatch(message)?;
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(handled),
            }
        }
    }
}

impl Stream for Connection {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inbound.poll_recv(cx) {
            Poll::Ready(Some(message)) => {
                let handled = self.dispatch(message.clone()).map(|()| message);
                Poll::Ready(Some(handled))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
