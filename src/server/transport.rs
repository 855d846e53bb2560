use crate::operation::Operation;
use crate::types::SessionId;

/// Outbound capability a [`Server`](super::Server) needs.
///
/// For each committed operation the server calls [`send_ack`] for the
/// submitter, then [`send_operation_except`] for everyone else, in that order.
/// Implementations must preserve send order per session.
///
/// [`send_ack`]: ServerTransport::send_ack
/// [`send_operation_except`]: ServerTransport::send_operation_except
pub trait ServerTransport {
    /// Tell `session_id` its in-flight operation was committed.
    fn send_ack(&mut self, session_id: &SessionId);

    /// Send a committed operation to every session except `session_id`.
    fn send_operation_except(&mut self, operation: &Operation, session_id: &SessionId);
}

impl<T: ServerTransport + ?Sized> ServerTransport for Box<T> {
    fn send_ack(&mut self, session_id: &SessionId) {
        (**self).send_ack(session_id);
    }

    fn send_operation_except(&mut self, operation: &Operation, session_id: &SessionId) {
        (**self).send_operation_except(operation, session_id);
    }
}
