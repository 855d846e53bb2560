//! The authoritative server replica.
//!
//! The server is the single point where concurrent submissions are put in a
//! total order. Each submission names the revision it was computed against;
//! the server transforms it past everything committed since, applies it,
//! appends it to the history, acknowledges the submitter and broadcasts the
//! transformed operation to every other session.
//!
//! # Module Organization
//!
//! ```text
//! server/
//! ├── synchronizer - Server: document, history, receive_operation
//! ├── transport    - ServerTransport capability (ack + broadcast)
//! ├── session      - SharedServer, Inbox, SessionRegistry (in-process channels)
//! └── config       - Server configuration
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Server`] | Document, history and the commit algorithm |
//! | [`ServerTransport`] | What a server needs to reach its clients |
//! | [`SharedServer`] | Lock-protected, cloneable server handle |
//! | [`Inbox`] | Ordered queue of client submissions |
//! | [`ServerConfig`] | Server configuration options |

mod config;
mod session;
mod synchronizer;
mod transport;

pub use config::ServerConfig;
pub use session::{Inbox, SessionRegistry, SharedServer};
pub use synchronizer::Server;
pub use transport::ServerTransport;
