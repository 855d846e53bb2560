//! Client-side replica and the Jupiter synchronization protocol.
//!
//! A client keeps its own copy of the document, applies local edits
//! immediately, and keeps at most one operation in flight to the server:
//!
//! - **Synchronized**: nothing pending; a local edit is sent at once
//! - **AwaitingAck**: one edit in flight; further local edits are buffered
//! - **AwaitingAckBuffered**: one edit in flight plus one composed buffer,
//!   which is sent when the in-flight edit is acknowledged
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── state      - Client and its state machine
//! ├── transport  - ClientTransport capability (outbound sends)
//! ├── connection - In-process channel transport and Connection driver
//! └── config     - Client configuration
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | One document replica with its protocol state |
//! | [`ClientTransport`] | What a client needs to reach the server |
//! | [`Connection`] | A client wired to a [`SharedServer`](crate::server::SharedServer) |
//! | [`ClientConfig`] | Client configuration options |

mod config;
mod connection;
mod state;
mod transport;

pub use config::ClientConfig;
pub use connection::{ChannelTransport, Connection};
pub use state::{Client, ClientStateKind};
pub use transport::ClientTransport;
