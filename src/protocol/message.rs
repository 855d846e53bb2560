//! Message envelope exchanged between clients and the server.
//!
//! ```text
//! client -> server   {"type":"operation","operation":[...],"revision":4}
//! server -> client   {"type":"acknowledge","sessionId":"alice"}
//! server -> client   {"type":"operation","operation":[...],"sessionId":"bob"}
//! ```
//!
//! The server stamps outgoing messages with the addressee's session id; the
//! client stamps outgoing operations with the revision they were computed
//! against.

use crate::error::Result;
use crate::operation::Operation;
use crate::types::{Revision, SessionId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// The server committed the addressee's in-flight operation.
    Acknowledge {
        /// Addressee on the server side
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// An operation, either submitted by a client or broadcast by the server.
    Operation {
        /// The edit
        operation: Operation,
        /// Revision the edit was computed against (client submissions)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        revision: Option<Revision>,
        /// Addressee or origin session
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
}

impl Message {
    /// Acknowledgement addressed to `session_id`.
    pub fn ack(session_id: SessionId) -> Self {
        Message::Acknowledge {
            session_id: Some(session_id),
        }
    }

    /// A client submission computed against `revision`.
    pub fn submit(operation: Operation, revision: Revision) -> Self {
        Message::Operation {
            operation,
            revision: Some(revision),
            session_id: None,
        }
    }

    /// A server broadcast addressed to `session_id`.
    pub fn broadcast(operation: Operation, session_id: SessionId) -> Self {
        Message::Operation {
            operation,
            revision: None,
            session_id: Some(session_id),
        }
    }

    /// Session id carried by the message, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Message::Acknowledge { session_id } | Message::Operation { session_id, .. } => {
                session_id.as_ref()
            }
        }
    }

    /// Serialize to JSON bytes.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parse from JSON bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
