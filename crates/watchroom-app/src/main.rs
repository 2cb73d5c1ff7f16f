//! Local driver for a watchroom session.
//!
//! Stands in for the presentation layer: joins a scripted roster, chats,
//! and runs a screen share against a simulated capture source, rendering
//! the room's event stream through tracing. A real deployment would put a
//! network transport and a UI where this binary's script is.

mod cli;

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use watchroom_common::{new_id, RoomId};
use watchroom_session::{
    CaptureHandle, CaptureSource, CaptureUnavailable, Identity, Presence, RoomError, RoomEvent,
    RoomManager,
};

/// Capture source that pretends the user granted the permission prompt.
struct LocalCapture;

#[async_trait]
impl CaptureSource for LocalCapture {
    async fn acquire(&self) -> Result<CaptureHandle, CaptureUnavailable> {
        // Simulate the user taking a moment on the permission dialog.
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok(CaptureHandle::new(new_id()))
    }
}

#[tokio::main]
async fn main() -> Result<(), RoomError> {
    let args = cli::parse();

    let directive = args.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap()),
            ),
        )
        .init();

    let manager = RoomManager::default();
    let room_id = RoomId::new(args.room.clone());
    let room = manager.create(&room_id).await;

    // Render the event stream the way a UI would.
    let mut events = room.subscribe();
    let renderer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RoomEvent::ParticipantJoined(p) => info!("{} joined", p.display_name),
                RoomEvent::ParticipantLeft(p) => info!("{} left", p.display_name),
                RoomEvent::PresenceChanged(p) => {
                    info!("{} is now {:?}", p.display_name, p.presence);
                }
                RoomEvent::MessageAppended(m) => info!("[{}] {}: {}", m.seq, m.sender_id, m.body),
                RoomEvent::ScreenShareStateChanged(s) => {
                    info!("screen share: {:?} (owner {:?})", s.state, s.owner_id);
                }
                RoomEvent::Unknown => {}
            }
        }
    });

    let me = Identity::generate(&args.name);
    let alice = Identity::generate("Alice");
    let bob = Identity::generate("Bob");
    let carol = Identity::generate("Carol");

    for who in [&me, &alice, &bob, &carol] {
        room.add_participant(who).await?;
    }
    // Carol is away from her desk in the scripted roster.
    room.set_presence(&carol.user_id, Presence::Idle).await?;

    room.send_message(&alice.user_id, "hi").await?;
    room.send_message(&bob.user_id, "yo").await?;
    room.send_message(&me.user_id, "let me share my screen").await?;

    let session = room.start_screen_share(&me.user_id, &LocalCapture).await?;
    info!(state = ?session.state, "share request resolved");

    room.send_message(&bob.user_id, "looks good").await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    if let Some(handle) = room.stop_screen_share(&me.user_id).await? {
        info!(stream = handle.stream_id(), "terminating local capture");
    }

    room.remove_participant(&alice.user_id).await;

    for message in room.history().await {
        info!(seq = message.seq, sender = message.sender_id.as_str(), "{}", message.body);
    }

    manager.dispose(&room_id).await;
    drop(room);
    let _ = renderer.await;
    Ok(())
}
