use crate::operation::Operation;
use crate::types::Revision;

/// Outbound capability a [`Client`](super::Client) needs: hand one operation
/// to the server.
///
/// Called exactly once per transition into the awaiting-ack state, with the
/// revision the operation was computed against. Implementations own wire
/// encoding and delivery, and must deliver in call order.
pub trait ClientTransport {
    /// Queue `operation` for the server, tagged with `revision`.
    fn send_operation(&mut self, operation: &Operation, revision: Revision);
}

impl<T: ClientTransport + ?Sized> ClientTransport for Box<T> {
    fn send_operation(&mut self, operation: &Operation, revision: Revision) {
        (**self).send_operation(operation, revision);
    }
}
