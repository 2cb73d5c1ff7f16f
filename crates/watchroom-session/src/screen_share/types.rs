//! Types and configuration for the screen share slot.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use watchroom_common::new_id;

use crate::error::CaptureUnavailable;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where the share slot currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareState {
    Idle,
    /// Reserved while the owner waits on the external capture prompt.
    Requesting,
    Active,
    /// The last request failed; cleared on acknowledgment or retry.
    Error,
}

/// Opaque reference to a live capture resource.
///
/// The manager owns the handle while a share is active and hands it back out
/// exactly once when the share ends, so the embedding application can
/// terminate the underlying stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureHandle(String);

impl CaptureHandle {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self(stream_id.into())
    }

    /// External stream id this handle refers to.
    pub fn stream_id(&self) -> &str {
        &self.0
    }
}

/// Single-use token tying a start request to its eventual outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTicket(String);

impl ShareTicket {
    pub(crate) fn issue() -> Self {
        Self(new_id())
    }
}

/// Snapshot of the share slot, emitted with every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenShareSession {
    pub state: ShareState,
    /// The sharing participant while requesting or active.
    pub owner_id: Option<String>,
    /// Bound capture handle; present exactly while active.
    pub capture: Option<CaptureHandle>,
    /// Failure reason while in the error state.
    pub error: Option<String>,
}

impl ScreenShareSession {
    pub fn idle() -> Self {
        Self {
            state: ShareState::Idle,
            owner_id: None,
            capture: None,
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Capture acquisition seam
// ---------------------------------------------------------------------------

/// Source of capture handles, implemented by the embedding application.
///
/// Acquisition is asynchronous, fallible, and usually user-mediated (a
/// platform permission prompt). The room session never holds its writer
/// lock across this call.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn acquire(&self) -> Result<CaptureHandle, CaptureUnavailable>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the share slot.
#[derive(Debug, Clone)]
pub struct ScreenShareConfig {
    /// How long a pending request may sit unresolved before its ticket goes
    /// stale. `None` keeps requests open forever.
    pub request_timeout: Option<Duration>,
}

impl Default for ScreenShareConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}
