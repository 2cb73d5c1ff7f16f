use tokio::sync::broadcast;

/// Fan-out bus for state-change notifications.
///
/// Wraps a tokio broadcast channel. Subscribers that fall behind lose the
/// oldest buffered events (broadcast lag semantics), so the capacity should
/// cover the burstiest mutation window a subscriber may sleep through.
pub struct EventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers. Returns the number of
    /// subscribers that received it.
    pub fn publish(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}
