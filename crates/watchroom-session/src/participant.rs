//! Participant registry: who is in the room and their presence.
//!
//! The registry is a plain struct; the owning `RoomSession` serializes all
//! mutations behind its writer lock and emits the matching notifications.

use serde::{Deserialize, Serialize};

use crate::error::RoomError;
use crate::identity::Identity;

/// Presence of a participant within the room.
///
/// Transitions are driven externally (activity and heartbeat signals); the
/// registry only records the latest value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    #[default]
    Active,
    Idle,
    Disconnected,
}

/// A room member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque id, unique within the room, stable for the membership.
    pub id: String,
    /// Human-readable label; may change without affecting identity.
    pub display_name: String,
    pub presence: Presence,
}

/// Tracks room membership in join order.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    // A Vec keeps list() stable and ordered by join time; rooms are small
    // enough that linear lookup beats carrying a second index.
    members: Vec<Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Add a participant with presence `Active`. Fails if the id is already
    /// present.
    pub fn join(&mut self, who: &Identity) -> Result<Participant, RoomError> {
        if self.contains(&who.user_id) {
            return Err(RoomError::DuplicateParticipant(who.user_id.clone()));
        }
        let participant = Participant {
            id: who.user_id.clone(),
            display_name: who.display_name.clone(),
            presence: Presence::Active,
        };
        self.members.push(participant.clone());
        Ok(participant)
    }

    /// Remove a participant, returning the removed entry. Absent ids are a
    /// no-op, not an error.
    pub fn leave(&mut self, id: &str) -> Option<Participant> {
        let idx = self.members.iter().position(|p| p.id == id)?;
        Some(self.members.remove(idx))
    }

    /// Update a participant's presence.
    pub fn set_presence(&mut self, id: &str, presence: Presence) -> Result<Participant, RoomError> {
        let participant = self.get_mut(id)?;
        participant.presence = presence;
        Ok(participant.clone())
    }

    /// Change a display name without touching identity.
    pub fn set_display_name(
        &mut self,
        id: &str,
        display_name: &str,
    ) -> Result<Participant, RoomError> {
        let participant = self.get_mut(id)?;
        participant.display_name = display_name.to_string();
        Ok(participant.clone())
    }

    /// Members ordered by join time. Stable until the next mutation.
    pub fn list(&self) -> Vec<Participant> {
        self.members.clone()
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.members.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Participant, RoomError> {
        self.members
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RoomError::UnknownParticipant(id.to_string()))
    }
}
