#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Operational Transformation for collaborative text
//!
//! This crate implements the concurrency-control core of a real-time
//! collaborative plain-text editor: any number of clients and one central
//! server edit the same document independently and converge to the same text
//! despite concurrent, interleaved edits.
//!
//! ## Overview
//!
//! The crate is made of two tightly coupled pieces:
//!
//! 1. **Operation algebra** - a canonical retain/insert/delete representation
//!    of an edit with `apply`, `invert`, `compose` and `transform`
//! 2. **Synchronization protocol** - the Jupiter client state machine
//!    (synchronized / awaiting ack / awaiting ack with buffer) and the server
//!    that transforms late submissions against its history and broadcasts
//!
//! Transports are injected through two narrow traits, [`ClientTransport`] and
//! [`ServerTransport`]. An in-process implementation over `tokio` channels
//! ([`SharedServer`] / [`client::Connection`]) is included.
//!
//! ## Data Flow
//!
//! ```text
//! user edit ─▶ Client::apply_client ─▶ send(op, revision)
//!                                            │
//!                                            ▼
//!              Server::receive_operation: transform past history[revision..],
//!              apply, append, ack sender, broadcast to others
//!                                            │
//!                                            ▼
//!              Client::apply_server: transform past in-flight + buffered, apply
//! ```
//!
//! ## Module Structure
//!
//! - **[operation]** - Operation algebra
//! - **[client]** - Client replica and protocol state machine
//! - **[server]** - Authoritative replica, shared server and sessions
//! - **[protocol]** - Wire codec and message envelope
//! - **[types]** - Revisions, session ids and snapshots
//! - **[error]** - Error types and result handling

pub mod client;
pub mod error;
pub mod operation;
pub mod protocol;
pub mod server;
pub mod types;

pub use client::{Client, ClientConfig, ClientStateKind, ClientTransport};
pub use error::{OtError, Result};
pub use operation::{compose, transform, BasicOperation, Operation};
pub use protocol::Message;
pub use server::{Server, ServerConfig, ServerTransport, SharedServer};
pub use types::{Revision, SessionId, Snapshot};

#[cfg(test)]
mod tests;
