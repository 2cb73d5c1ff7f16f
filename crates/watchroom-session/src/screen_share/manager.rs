//! The share slot state machine.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::RoomError;

use super::types::{CaptureHandle, ScreenShareConfig, ScreenShareSession, ShareState, ShareTicket};

/// Internal slot state. Shapes the data so an active share always holds a
/// handle and an idle or failed one never does.
#[derive(Debug)]
enum Slot {
    Idle,
    Requesting {
        owner_id: String,
        ticket: ShareTicket,
        deadline: Option<Instant>,
    },
    Active {
        owner_id: String,
        handle: CaptureHandle,
    },
    Error {
        reason: String,
    },
}

/// Owns the room's single share slot.
///
/// A plain struct: the `RoomSession` mutates it under the room's writer
/// lock, which is what makes every transition atomic with respect to the
/// rest of the room.
pub struct ScreenShareManager {
    config: ScreenShareConfig,
    slot: Slot,
}

impl ScreenShareManager {
    pub fn new(config: ScreenShareConfig) -> Self {
        Self {
            config,
            slot: Slot::Idle,
        }
    }

    /// Reserve the slot for `owner_id` and issue a ticket for the external
    /// capture step. Fails while another request or share holds the slot,
    /// regardless of requester.
    pub fn request_start(&mut self, owner_id: &str) -> Result<ShareTicket, RoomError> {
        self.expire_stale_request();
        match self.slot {
            Slot::Requesting { .. } | Slot::Active { .. } => Err(RoomError::AlreadyActive),
            Slot::Idle | Slot::Error { .. } => {
                let ticket = ShareTicket::issue();
                let deadline = self.config.request_timeout.map(|t| Instant::now() + t);
                self.slot = Slot::Requesting {
                    owner_id: owner_id.to_string(),
                    ticket: ticket.clone(),
                    deadline,
                };
                info!(owner_id, "screen share requested");
                Ok(ticket)
            }
        }
    }

    /// Resolve the pending request with a granted capture handle.
    pub fn confirm_active(
        &mut self,
        ticket: &ShareTicket,
        handle: CaptureHandle,
    ) -> Result<ScreenShareSession, RoomError> {
        self.expire_stale_request();
        let owner_id = match &self.slot {
            Slot::Requesting {
                owner_id,
                ticket: pending,
                ..
            } if pending == ticket => owner_id.clone(),
            _ => return Err(RoomError::InvalidTicket),
        };
        info!(owner_id = %owner_id, stream = handle.stream_id(), "screen share active");
        self.slot = Slot::Active { owner_id, handle };
        Ok(self.current())
    }

    /// Resolve the pending request with a denial or failure. The ticket is
    /// dead and the slot immediately reclaimable: a failed grant must not
    /// lock the room out of sharing until someone resets it.
    pub fn report_failure(
        &mut self,
        ticket: &ShareTicket,
        reason: &str,
    ) -> Result<ScreenShareSession, RoomError> {
        self.expire_stale_request();
        match &self.slot {
            Slot::Requesting {
                ticket: pending, ..
            } if pending == ticket => {}
            _ => return Err(RoomError::InvalidTicket),
        }
        warn!(reason, "screen share request failed");
        self.slot = Slot::Error {
            reason: reason.to_string(),
        };
        Ok(self.current())
    }

    /// Stop the owner's share, handing the capture handle back for external
    /// termination. Stopping an idle slot is a no-op. The owner may also
    /// cancel their own still-pending request.
    pub fn stop(&mut self, owner_id: &str) -> Result<Option<CaptureHandle>, RoomError> {
        match &self.slot {
            Slot::Idle | Slot::Error { .. } => return Ok(None),
            Slot::Requesting {
                owner_id: owner, ..
            }
            | Slot::Active {
                owner_id: owner, ..
            } => {
                if owner.as_str() != owner_id {
                    return Err(RoomError::NotOwner(owner_id.to_string()));
                }
            }
        }
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Active { handle, .. } => {
                info!(owner_id, "screen share stopped");
                Ok(Some(handle))
            }
            _ => {
                debug!(owner_id, "pending screen share request cancelled");
                Ok(None)
            }
        }
    }

    /// Capture-source-ended signal. No owner check; the signal originates
    /// from the owner's own device. Active goes to idle, anything else is a
    /// no-op.
    pub fn external_termination(&mut self) -> Option<CaptureHandle> {
        if !matches!(self.slot, Slot::Active { .. }) {
            return None;
        }
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Active { owner_id, handle } => {
                info!(owner_id = %owner_id, "screen share ended by capture source");
                Some(handle)
            }
            _ => None,
        }
    }

    /// Acknowledge a failed request, returning the slot to idle.
    pub fn acknowledge_error(&mut self) {
        if matches!(self.slot, Slot::Error { .. }) {
            self.slot = Slot::Idle;
        }
    }

    /// Current snapshot of the slot.
    pub fn current(&self) -> ScreenShareSession {
        match &self.slot {
            Slot::Idle => ScreenShareSession::idle(),
            Slot::Requesting { owner_id, .. } => ScreenShareSession {
                state: ShareState::Requesting,
                owner_id: Some(owner_id.clone()),
                capture: None,
                error: None,
            },
            Slot::Active { owner_id, handle } => ScreenShareSession {
                state: ShareState::Active,
                owner_id: Some(owner_id.clone()),
                capture: Some(handle.clone()),
                error: None,
            },
            Slot::Error { reason } => ScreenShareSession {
                state: ShareState::Error,
                owner_id: None,
                capture: None,
                error: Some(reason.clone()),
            },
        }
    }

    /// Owner of the slot while a request or share is in flight.
    pub fn owner(&self) -> Option<&str> {
        match &self.slot {
            Slot::Requesting { owner_id, .. } | Slot::Active { owner_id, .. } => Some(owner_id),
            Slot::Idle | Slot::Error { .. } => None,
        }
    }

    /// A request whose deadline has passed is treated as failed.
    fn expire_stale_request(&mut self) {
        let expired = matches!(
            &self.slot,
            Slot::Requesting {
                deadline: Some(deadline),
                ..
            } if Instant::now() >= *deadline
        );
        if expired {
            debug!("pending screen share request expired");
            self.slot = Slot::Error {
                reason: "share request timed out".to_string(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager() -> ScreenShareManager {
        // No deadline; the expiry path is exercised separately.
        ScreenShareManager::new(ScreenShareConfig {
            request_timeout: None,
        })
    }

    fn handle() -> CaptureHandle {
        CaptureHandle::new("stream-1")
    }

    #[test]
    fn request_and_confirm_goes_active() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();
        assert_eq!(mgr.current().state, ShareState::Requesting);
        assert_eq!(mgr.owner(), Some("a"));

        let session = mgr.confirm_active(&ticket, handle()).unwrap();
        assert_eq!(session.state, ShareState::Active);
        assert_eq!(session.owner_id.as_deref(), Some("a"));
        assert_eq!(
            session.capture.as_ref().map(CaptureHandle::stream_id),
            Some("stream-1")
        );
    }

    #[test]
    fn second_request_is_rejected_while_pending_or_active() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();
        assert_eq!(mgr.request_start("b").unwrap_err(), RoomError::AlreadyActive);
        // The same requester cannot reserve twice either.
        assert_eq!(mgr.request_start("a").unwrap_err(), RoomError::AlreadyActive);

        mgr.confirm_active(&ticket, handle()).unwrap();
        assert_eq!(mgr.request_start("b").unwrap_err(), RoomError::AlreadyActive);
    }

    #[test]
    fn mismatched_ticket_never_mutates_state() {
        let mut mgr = manager();
        let _ticket = mgr.request_start("a").unwrap();
        let forged = ShareTicket::issue();

        assert_eq!(
            mgr.confirm_active(&forged, handle()).unwrap_err(),
            RoomError::InvalidTicket
        );
        assert_eq!(
            mgr.report_failure(&forged, "nope").unwrap_err(),
            RoomError::InvalidTicket
        );
        assert_eq!(mgr.current().state, ShareState::Requesting);
    }

    #[test]
    fn resolved_ticket_cannot_be_reused() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();
        mgr.confirm_active(&ticket, handle()).unwrap();

        assert_eq!(
            mgr.confirm_active(&ticket, handle()).unwrap_err(),
            RoomError::InvalidTicket
        );
        assert_eq!(
            mgr.report_failure(&ticket, "late").unwrap_err(),
            RoomError::InvalidTicket
        );
        assert_eq!(mgr.current().state, ShareState::Active);
    }

    #[test]
    fn failure_releases_the_slot_for_retry() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();
        let session = mgr.report_failure(&ticket, "permission denied").unwrap();
        assert_eq!(session.state, ShareState::Error);
        assert_eq!(session.error.as_deref(), Some("permission denied"));
        assert!(session.capture.is_none());

        // Retry works straight from the error state, no reset required.
        let retry = mgr.request_start("b").unwrap();
        assert_eq!(mgr.current().state, ShareState::Requesting);
        mgr.confirm_active(&retry, handle()).unwrap();
        assert_eq!(mgr.current().state, ShareState::Active);
    }

    #[test]
    fn acknowledge_clears_the_error_state() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();
        mgr.report_failure(&ticket, "denied").unwrap();

        mgr.acknowledge_error();
        assert_eq!(mgr.current(), ScreenShareSession::idle());

        // Acknowledging an idle slot changes nothing.
        mgr.acknowledge_error();
        assert_eq!(mgr.current(), ScreenShareSession::idle());
    }

    #[test]
    fn stop_requires_the_owner() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();
        mgr.confirm_active(&ticket, handle()).unwrap();

        assert_eq!(mgr.stop("b").unwrap_err(), RoomError::NotOwner("b".into()));
        assert_eq!(mgr.current().state, ShareState::Active);

        let released = mgr.stop("a").unwrap();
        assert_eq!(released.as_ref().map(CaptureHandle::stream_id), Some("stream-1"));
        assert_eq!(mgr.current(), ScreenShareSession::idle());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut mgr = manager();
        assert_eq!(mgr.stop("a").unwrap(), None);

        let ticket = mgr.request_start("a").unwrap();
        mgr.confirm_active(&ticket, handle()).unwrap();
        assert!(mgr.stop("a").unwrap().is_some());
        assert_eq!(mgr.stop("a").unwrap(), None);
        assert_eq!(mgr.current(), ScreenShareSession::idle());
    }

    #[test]
    fn owner_can_cancel_a_pending_request() {
        let mut mgr = manager();
        let ticket = mgr.request_start("a").unwrap();

        assert_eq!(mgr.stop("b").unwrap_err(), RoomError::NotOwner("b".into()));
        assert_eq!(mgr.stop("a").unwrap(), None);
        assert_eq!(mgr.current(), ScreenShareSession::idle());

        // The abandoned ticket is dead.
        assert_eq!(
            mgr.confirm_active(&ticket, handle()).unwrap_err(),
            RoomError::InvalidTicket
        );
    }

    #[test]
    fn external_termination_is_idempotent_and_unchecked() {
        let mut mgr = manager();
        assert!(mgr.external_termination().is_none());

        let ticket = mgr.request_start("a").unwrap();
        // Nothing is captured yet, so there is nothing to terminate.
        assert!(mgr.external_termination().is_none());
        assert_eq!(mgr.current().state, ShareState::Requesting);

        mgr.confirm_active(&ticket, handle()).unwrap();
        assert!(mgr.external_termination().is_some());
        assert_eq!(mgr.current(), ScreenShareSession::idle());
        assert!(mgr.external_termination().is_none());
    }

    #[test]
    fn expired_request_fails_lazily_and_frees_the_slot() {
        let mut mgr = ScreenShareManager::new(ScreenShareConfig {
            request_timeout: Some(Duration::ZERO),
        });
        let ticket = mgr.request_start("a").unwrap();

        // The deadline has already passed; resolving the ticket fails and
        // parks the slot in the error state.
        assert_eq!(
            mgr.confirm_active(&ticket, handle()).unwrap_err(),
            RoomError::InvalidTicket
        );
        assert_eq!(mgr.current().state, ShareState::Error);

        // A fresh request reclaims the slot.
        let retry = mgr.request_start("b").unwrap();
        assert_eq!(mgr.owner(), Some("b"));
        drop(retry);
    }

    #[test]
    fn snapshots_pair_handles_with_the_active_state_only() {
        let mut mgr = manager();
        assert!(mgr.current().capture.is_none());

        let ticket = mgr.request_start("a").unwrap();
        assert!(mgr.current().capture.is_none());

        mgr.confirm_active(&ticket, handle()).unwrap();
        assert!(mgr.current().capture.is_some());

        mgr.stop("a").unwrap();
        assert!(mgr.current().capture.is_none());
    }
}
