pub mod events;
pub mod id;

pub use events::EventBus;
pub use id::{new_id, RoomId};
