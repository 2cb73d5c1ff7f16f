//! Room session core: participants, an ordered chat log, and the single
//! screen-share slot of a room, composed behind one session object.
//!
//! The crate models state and invariants only. Transport, rendering, and
//! identity issuance stay with the embedding application, which drives this
//! API and renders the event stream it emits.

pub mod error;
pub mod events;
pub mod identity;
pub mod message;
pub mod participant;
pub mod room;
pub mod screen_share;

pub use error::{CaptureUnavailable, RoomError};
pub use events::RoomEvent;
pub use identity::Identity;
pub use message::{Message, MessageId, MessageLog, SYSTEM_SENDER};
pub use participant::{Participant, ParticipantRegistry, Presence};
pub use room::{RoomConfig, RoomManager, RoomSession};
pub use screen_share::{
    CaptureHandle, CaptureSource, ScreenShareConfig, ScreenShareManager, ScreenShareSession,
    ShareState, ShareTicket,
};
