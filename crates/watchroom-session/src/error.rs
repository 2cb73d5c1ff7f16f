//! Error types for room operations.

use thiserror::Error;

/// A rejected room intent.
///
/// Every variant is a synchronous validation failure: the operation left the
/// room untouched and the caller may surface the message and retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("participant already in room: {0}")]
    DuplicateParticipant(String),

    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("message body is empty")]
    EmptyBody,

    #[error("unknown sender: {0}")]
    UnknownSender(String),

    #[error("a screen share is already active or being requested")]
    AlreadyActive,

    #[error("share ticket does not match the pending request")]
    InvalidTicket,

    #[error("participant does not own the share: {0}")]
    NotOwner(String),
}

/// The external capture source declined or failed to produce a handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("capture unavailable: {0}")]
pub struct CaptureUnavailable(pub String);
