//! The room session: membership, chat, and the share slot composed behind
//! one object, plus the manager that owns live sessions per room id.
//!
//! All mutations for a room run under a single writer lock, which is what
//! gives the log its gap-free ordering and the share slot its exclusivity
//! without any caller-visible locking. Events are published while the lock
//! is held, so subscribers observe them in mutation order.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use watchroom_common::{EventBus, RoomId};

use crate::error::RoomError;
use crate::events::RoomEvent;
use crate::identity::Identity;
use crate::message::{Message, MessageLog};
use crate::participant::{Participant, ParticipantRegistry, Presence};
use crate::screen_share::{
    CaptureHandle, CaptureSource, ScreenShareConfig, ScreenShareManager, ScreenShareSession,
    ShareTicket,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration applied to every room a manager creates.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// System message appended when the room is created.
    pub welcome_message: Option<String>,
    /// Announce share start and stop in chat as system messages.
    pub announce_screen_share: bool,
    /// Buffer size of the event stream; lagging subscribers lose oldest
    /// events first.
    pub event_capacity: usize,
    pub share: ScreenShareConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            welcome_message: Some("Welcome! Start chatting or share your screen.".to_string()),
            announce_screen_share: true,
            event_capacity: 256,
            share: ScreenShareConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Room session
// ---------------------------------------------------------------------------

/// Everything a room owns, behind one writer lock.
struct RoomState {
    registry: ParticipantRegistry,
    log: MessageLog,
    share: ScreenShareManager,
}

/// A live room session.
///
/// The presentation layer mutates the room only through this object and
/// observes it through [`RoomSession::subscribe`]. Reads return snapshots as
/// of the latest completed mutation.
pub struct RoomSession {
    id: RoomId,
    config: RoomConfig,
    state: RwLock<RoomState>,
    events: EventBus<RoomEvent>,
}

impl RoomSession {
    pub fn new(id: RoomId, config: RoomConfig) -> Self {
        let mut log = MessageLog::new();
        if let Some(welcome) = &config.welcome_message {
            // Creation precedes any subscriber, so the welcome message is
            // observed through history() rather than the event stream.
            let _ = log.append_system(welcome);
        }
        let state = RoomState {
            registry: ParticipantRegistry::new(),
            log,
            share: ScreenShareManager::new(config.share.clone()),
        };
        let events = EventBus::new(config.event_capacity);
        Self {
            id,
            config,
            state: RwLock::new(state),
            events,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Subscribe to the room's notification stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    // --- membership ---

    /// Add a participant to the room.
    pub async fn add_participant(&self, who: &Identity) -> Result<Participant, RoomError> {
        let mut guard = self.state.write().await;
        let participant = guard.registry.join(who)?;
        info!(room = %self.id, participant = who.user_id.as_str(), "participant joined");
        self.events
            .publish(RoomEvent::ParticipantJoined(participant.clone()));
        Ok(participant)
    }

    /// Remove a participant, returning the removed entry. Absent ids are a
    /// no-op. If the departing participant holds the share slot (active or
    /// still requesting), the share is torn down inside the same lock
    /// acquisition, so no share outlives its owner.
    pub async fn remove_participant(&self, id: &str) -> Option<Participant> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let removed = state.registry.leave(id)?;
        info!(room = %self.id, participant = id, "participant left");
        self.events
            .publish(RoomEvent::ParticipantLeft(removed.clone()));

        if state.share.owner() == Some(id) {
            // The owner check always passes here.
            if let Ok(released) = state.share.stop(id) {
                if let Some(handle) = released {
                    debug!(
                        stream = handle.stream_id(),
                        "capture released with departing owner"
                    );
                }
                self.events
                    .publish(RoomEvent::ScreenShareStateChanged(state.share.current()));
                self.announce(
                    state,
                    &format!("{} stopped sharing their screen.", removed.display_name),
                );
            }
        }
        Some(removed)
    }

    /// Update a participant's presence.
    pub async fn set_presence(
        &self,
        id: &str,
        presence: Presence,
    ) -> Result<Participant, RoomError> {
        let mut guard = self.state.write().await;
        let participant = guard.registry.set_presence(id, presence)?;
        self.events
            .publish(RoomEvent::PresenceChanged(participant.clone()));
        Ok(participant)
    }

    /// Change a display name. Identity is unaffected; subscribers see the
    /// updated participant on the presence channel.
    pub async fn set_display_name(
        &self,
        id: &str,
        display_name: &str,
    ) -> Result<Participant, RoomError> {
        let mut guard = self.state.write().await;
        let participant = guard.registry.set_display_name(id, display_name)?;
        self.events
            .publish(RoomEvent::PresenceChanged(participant.clone()));
        Ok(participant)
    }

    /// Members in join order, as of the latest completed mutation.
    pub async fn participants(&self) -> Vec<Participant> {
        self.state.read().await.registry.list()
    }

    // --- chat ---

    /// Append a participant-authored chat message.
    pub async fn send_message(&self, sender_id: &str, body: &str) -> Result<Message, RoomError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let message = state.log.append(&state.registry, sender_id, body)?;
        self.events
            .publish(RoomEvent::MessageAppended(message.clone()));
        Ok(message)
    }

    /// Append a room-generated system message.
    pub async fn send_system_message(&self, body: &str) -> Result<Message, RoomError> {
        let mut guard = self.state.write().await;
        let message = guard.log.append_system(body)?;
        self.events
            .publish(RoomEvent::MessageAppended(message.clone()));
        Ok(message)
    }

    /// Owned snapshot of the full chat history in sequence order.
    pub async fn history(&self) -> Vec<Message> {
        self.state.read().await.log.snapshot()
    }

    // --- screen share ---

    /// Run the full two-phase start protocol against a capture source.
    ///
    /// Reserves the slot, then awaits the external grant with the writer
    /// lock released, so the rest of the room keeps moving while the
    /// permission prompt is up. The grant or denial then resolves the
    /// ticket; a denial is reported through the returned snapshot (error
    /// state), not as a `RoomError`.
    pub async fn start_screen_share(
        &self,
        participant_id: &str,
        source: &dyn CaptureSource,
    ) -> Result<ScreenShareSession, RoomError> {
        let ticket = self.request_screen_share(participant_id).await?;
        match source.acquire().await {
            Ok(handle) => self.confirm_screen_share(&ticket, handle).await,
            Err(denied) => self.fail_screen_share(&ticket, &denied.to_string()).await,
        }
    }

    /// First phase: validate the requester and reserve the share slot.
    pub async fn request_screen_share(
        &self,
        participant_id: &str,
    ) -> Result<ShareTicket, RoomError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if !state.registry.contains(participant_id) {
            return Err(RoomError::UnknownParticipant(participant_id.to_string()));
        }
        let ticket = state.share.request_start(participant_id)?;
        self.events
            .publish(RoomEvent::ScreenShareStateChanged(state.share.current()));
        Ok(ticket)
    }

    /// Second phase, grant: bind the capture handle and go active.
    pub async fn confirm_screen_share(
        &self,
        ticket: &ShareTicket,
        handle: CaptureHandle,
    ) -> Result<ScreenShareSession, RoomError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let session = state.share.confirm_active(ticket, handle)?;
        self.events
            .publish(RoomEvent::ScreenShareStateChanged(session.clone()));
        if let Some(owner) = session.owner_id.as_deref() {
            let name = display_name_for(&state.registry, owner);
            self.announce(state, &format!("{name} started sharing their screen."));
        }
        Ok(session)
    }

    /// Second phase, denial: record the failure and release the slot.
    pub async fn fail_screen_share(
        &self,
        ticket: &ShareTicket,
        reason: &str,
    ) -> Result<ScreenShareSession, RoomError> {
        let mut guard = self.state.write().await;
        let session = guard.share.report_failure(ticket, reason)?;
        self.events
            .publish(RoomEvent::ScreenShareStateChanged(session.clone()));
        Ok(session)
    }

    /// Stop the caller's share (owner-checked), handing back the released
    /// capture handle for external termination. Idempotent when idle.
    pub async fn stop_screen_share(
        &self,
        participant_id: &str,
    ) -> Result<Option<CaptureHandle>, RoomError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let before = state.share.current();
        let released = state.share.stop(participant_id)?;
        let after = state.share.current();
        if after != before {
            self.events
                .publish(RoomEvent::ScreenShareStateChanged(after));
        }
        if released.is_some() {
            let name = display_name_for(&state.registry, participant_id);
            self.announce(state, &format!("{name} stopped sharing their screen."));
        }
        Ok(released)
    }

    /// Capture-source-ended signal (the user stopped sharing from a native
    /// control). No owner check; the signal comes from the owner's device.
    pub async fn capture_ended(&self) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let owner = state.share.owner().map(str::to_string);
        if let Some(handle) = state.share.external_termination() {
            debug!(stream = handle.stream_id(), "capture ended externally");
            self.events
                .publish(RoomEvent::ScreenShareStateChanged(state.share.current()));
            if let Some(owner) = owner {
                let name = display_name_for(&state.registry, &owner);
                self.announce(state, &format!("{name} stopped sharing their screen."));
            }
        }
    }

    /// Clear a failed share request after the owner has seen the error.
    pub async fn acknowledge_share_error(&self) {
        let mut guard = self.state.write().await;
        let before = guard.share.current();
        guard.share.acknowledge_error();
        let after = guard.share.current();
        if after != before {
            self.events.publish(RoomEvent::ScreenShareStateChanged(after));
        }
    }

    /// Snapshot of the share slot.
    pub async fn screen_share(&self) -> ScreenShareSession {
        self.state.read().await.share.current()
    }

    fn announce(&self, state: &mut RoomState, body: &str) {
        if !self.config.announce_screen_share {
            return;
        }
        if let Ok(message) = state.log.append_system(body) {
            self.events.publish(RoomEvent::MessageAppended(message));
        }
    }
}

fn display_name_for(registry: &ParticipantRegistry, id: &str) -> String {
    registry
        .get(id)
        .map(|p| p.display_name.clone())
        .unwrap_or_else(|| id.to_string())
}

// ---------------------------------------------------------------------------
// Room manager
// ---------------------------------------------------------------------------

/// Owns the live sessions, one per room id.
///
/// Sessions are created and disposed here and injected into the presentation
/// layer, rather than living as ambient page state.
pub struct RoomManager {
    config: RoomConfig,
    rooms: RwLock<HashMap<RoomId, Arc<RoomSession>>>,
}

impl RoomManager {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Session for `id`, created on first use.
    pub async fn create(&self, id: &RoomId) -> Arc<RoomSession> {
        let mut rooms = self.rooms.write().await;
        Arc::clone(rooms.entry(id.clone()).or_insert_with(|| {
            info!(room = %id, "room created");
            Arc::new(RoomSession::new(id.clone(), self.config.clone()))
        }))
    }

    /// Drop the session for `id`. Holders of the Arc keep a working room;
    /// the manager just stops handing it out.
    pub async fn dispose(&self, id: &RoomId) -> Option<Arc<RoomSession>> {
        let removed = self.rooms.write().await.remove(id);
        if removed.is_some() {
            info!(room = %id, "room disposed");
        }
        removed
    }

    pub async fn get(&self, id: &RoomId) -> Option<Arc<RoomSession>> {
        self.rooms.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
