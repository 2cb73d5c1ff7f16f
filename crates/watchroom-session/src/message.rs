//! Append-only message log with log-assigned ordering.
//!
//! Ordering is by the log's own sequence counter, never by timestamp: wall
//! clocks skew and two sends can land in the same millisecond, and neither
//! may reorder the conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RoomError;
use crate::participant::ParticipantRegistry;

/// Reserved sender id for room-generated informational messages.
pub const SYSTEM_SENDER: &str = "system";

/// Opaque message identity, assigned by the log at append time.
///
/// Shares the sequence counter, but callers should treat it as an equality
/// token and order by `Message::seq` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// A participant id, or [`SYSTEM_SENDER`].
    pub sender_id: String,
    /// Trimmed, non-empty, uninterpreted text.
    pub body: String,
    /// Sole ordering key; strictly increasing with no gaps.
    pub seq: u64,
    /// Capture-time wall clock, for display only.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Whether this message was produced by the room itself.
    pub fn is_system(&self) -> bool {
        self.sender_id == SYSTEM_SENDER
    }
}

/// Ordered, append-only record of a room's chat.
///
/// Messages are never evicted: the log is the ordering authority, and a gap
/// in the sequence would be indistinguishable from lost history.
#[derive(Debug)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_seq: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_seq: 1,
        }
    }

    /// Append a participant-authored message.
    ///
    /// The sender must be currently in the registry. Messages from
    /// since-departed members stay in the log, but a departed member cannot
    /// append new ones.
    pub fn append(
        &mut self,
        registry: &ParticipantRegistry,
        sender_id: &str,
        body: &str,
    ) -> Result<Message, RoomError> {
        if sender_id != SYSTEM_SENDER && !registry.contains(sender_id) {
            return Err(RoomError::UnknownSender(sender_id.to_string()));
        }
        self.push(sender_id, body)
    }

    /// Append a room-generated message from the reserved system sender.
    pub fn append_system(&mut self, body: &str) -> Result<Message, RoomError> {
        self.push(SYSTEM_SENDER, body)
    }

    /// All messages in ascending sequence order. Lazy and restartable; sees
    /// the log as of this borrow.
    pub fn history(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Owned copy of the full history.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn get(&self, seq: u64) -> Option<&Message> {
        // seq is dense and starts at 1, so index math is enough
        seq.checked_sub(1)
            .and_then(|idx| self.messages.get(idx as usize))
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, sender_id: &str, body: &str) -> Result<Message, RoomError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(RoomError::EmptyBody);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let message = Message {
            id: MessageId(seq),
            sender_id: sender_id.to_string(),
            body: body.to_string(),
            seq,
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        Ok(message)
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    fn one_member_registry() -> ParticipantRegistry {
        let mut registry = ParticipantRegistry::new();
        registry.join(&Identity::new("a", "Alice")).unwrap();
        registry
    }

    #[test]
    fn sequences_increase_by_one_with_no_gaps() {
        let registry = one_member_registry();
        let mut log = MessageLog::new();
        for expected in 1..=50u64 {
            let message = log.append(&registry, "a", "hello").unwrap();
            assert_eq!(message.seq, expected);
            assert_eq!(message.id, MessageId(expected));
        }
        let seqs: Vec<u64> = log.history().map(|m| m.seq).collect();
        assert_eq!(seqs, (1..=50).collect::<Vec<u64>>());
    }

    #[test]
    fn empty_body_is_rejected() {
        let registry = one_member_registry();
        let mut log = MessageLog::new();
        assert_eq!(log.append(&registry, "a", "").unwrap_err(), RoomError::EmptyBody);
        assert_eq!(
            log.append(&registry, "a", "   \n\t ").unwrap_err(),
            RoomError::EmptyBody
        );
        // A rejected append consumes no sequence number.
        assert_eq!(log.append(&registry, "a", "first").unwrap().seq, 1);
    }

    #[test]
    fn body_is_stored_trimmed() {
        let registry = one_member_registry();
        let mut log = MessageLog::new();
        let message = log.append(&registry, "a", "  hi there  ").unwrap();
        assert_eq!(message.body, "hi there");
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let registry = one_member_registry();
        let mut log = MessageLog::new();
        let err = log.append(&registry, "ghost", "boo").unwrap_err();
        assert_eq!(err, RoomError::UnknownSender("ghost".into()));
        assert!(log.is_empty());
    }

    #[test]
    fn departed_sender_cannot_append_but_history_survives() {
        let mut registry = one_member_registry();
        let mut log = MessageLog::new();
        log.append(&registry, "a", "hi").unwrap();

        registry.leave("a");
        let err = log.append(&registry, "a", "still here?").unwrap_err();
        assert_eq!(err, RoomError::UnknownSender("a".into()));

        let history: Vec<&Message> = log.history().collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender_id, "a");
    }

    #[test]
    fn system_messages_skip_the_sender_check() {
        let mut log = MessageLog::new();
        let message = log.append_system("share started").unwrap();
        assert!(message.is_system());
        assert_eq!(message.seq, 1);
    }

    #[test]
    fn system_messages_still_validate_the_body() {
        let mut log = MessageLog::new();
        assert_eq!(log.append_system("  ").unwrap_err(), RoomError::EmptyBody);
    }

    #[test]
    fn history_is_restartable() {
        let registry = one_member_registry();
        let mut log = MessageLog::new();
        log.append(&registry, "a", "one").unwrap();
        log.append(&registry, "a", "two").unwrap();

        let first: Vec<u64> = log.history().map(|m| m.seq).collect();
        let second: Vec<u64> = log.history().map(|m| m.seq).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 2]);
    }

    #[test]
    fn get_by_sequence() {
        let registry = one_member_registry();
        let mut log = MessageLog::new();
        log.append(&registry, "a", "one").unwrap();
        log.append(&registry, "a", "two").unwrap();

        assert_eq!(log.get(2).unwrap().body, "two");
        assert!(log.get(0).is_none());
        assert!(log.get(3).is_none());
        assert_eq!(log.last().unwrap().seq, 2);
    }
}
