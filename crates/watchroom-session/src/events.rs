//! The unified room notification stream.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::participant::Participant;
use crate::screen_share::ScreenShareSession;

/// State-change notifications, delivered in mutation order.
///
/// This is the only channel the presentation layer needs to stay in sync,
/// and the envelope a network transport would serialize to reach other
/// clients. Each variant carries the updated entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEvent {
    ParticipantJoined(Participant),
    ParticipantLeft(Participant),
    PresenceChanged(Participant),
    MessageAppended(Message),
    ScreenShareStateChanged(ScreenShareSession),
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageId;
    use crate::participant::Presence;
    use crate::screen_share::ShareState;
    use chrono::Utc;

    #[test]
    fn participant_event_round_trips() {
        let event = RoomEvent::ParticipantJoined(Participant {
            id: "a".into(),
            display_name: "Alice".into(),
            presence: Presence::Active,
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: RoomEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, RoomEvent::ParticipantJoined(p) if p.id == "a"));
    }

    #[test]
    fn message_event_round_trips() {
        let event = RoomEvent::MessageAppended(Message {
            id: MessageId(1),
            sender_id: "a".into(),
            body: "hi".into(),
            seq: 1,
            timestamp: Utc::now(),
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: RoomEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, RoomEvent::MessageAppended(m) if m.seq == 1 && m.body == "hi"));
    }

    #[test]
    fn share_event_round_trips() {
        let event = RoomEvent::ScreenShareStateChanged(ScreenShareSession::idle());
        let json = serde_json::to_string(&event).unwrap();
        let back: RoomEvent = serde_json::from_str(&json).unwrap();
        assert!(
            matches!(back, RoomEvent::ScreenShareStateChanged(s) if s.state == ShareState::Idle)
        );
    }

    #[test]
    fn envelope_uses_tagged_shape() {
        let event = RoomEvent::PresenceChanged(Participant {
            id: "a".into(),
            display_name: "Alice".into(),
            presence: Presence::Idle,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "PresenceChanged");
        assert_eq!(value["data"]["presence"], "idle");
    }

    #[test]
    fn unknown_event_deserializes() {
        let json = r#"{"type":"SomeNewEventWeNeverHeardOf","data":null}"#;
        let event: RoomEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, RoomEvent::Unknown));
    }
}
