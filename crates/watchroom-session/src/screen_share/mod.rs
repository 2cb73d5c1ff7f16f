//! Screen share lifecycle for a room.
//!
//! A room has one share slot. Acquiring the platform capture handle is an
//! external, user-gated step, so starting a share is a two-phase protocol:
//! `request_start` reserves the slot and issues a ticket, and the eventual
//! grant or denial resolves the ticket via `confirm_active` or
//! `report_failure`. The reservation is what keeps two participants from
//! racing each other while both wait on a permission prompt.

mod manager;
mod types;

pub use manager::ScreenShareManager;
pub use types::{
    CaptureHandle, CaptureSource, ScreenShareConfig, ScreenShareSession, ShareState, ShareTicket,
};
