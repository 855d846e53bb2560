//! Wire formats shared by clients and the server.
//!
//! The engine itself never touches bytes; these helpers exist for the
//! transports that carry operations between endpoints.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`encode_operation`] / [`decode_operation`] | Operation as a JSON record array |
//! | [`Message`] | Acknowledge / operation envelope |

pub(crate) mod codec;
mod message;

pub use codec::{decode_operation, encode_operation};
pub use message::Message;
