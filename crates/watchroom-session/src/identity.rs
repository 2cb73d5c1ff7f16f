//! Participant identity as handed in by the host application.
//!
//! Identity issuance (auth, account lookup) happens outside the room core;
//! a session only ever sees the resolved id and display name.

use serde::{Deserialize, Serialize};

use watchroom_common::new_id;

/// A resolved identity used to join a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Mint a throwaway identity with a random id. Useful for local sessions
    /// and tests; production ids come from the identity provider.
    pub fn generate(display_name: &str) -> Self {
        Self {
            user_id: new_id(),
            display_name: display_name.to_string(),
        }
    }
}
