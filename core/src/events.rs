//! Session lifecycle notifications.
//!
//! The session layer never navigates anywhere itself. It publishes these
//! events and the front end decides what to do, typically routing to the
//! login screen on [`SessionEvent::Expired`].

use tokio::sync::broadcast;

pub const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// A 401 arrived and there was no refresh token to recover with.
    MissingRefreshToken,
    /// The refresh call failed; the whole session was cleared.
    RefreshRejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { demo: bool },
    Refreshed,
    Expired(ExpiryReason),
    LoggedOut,
}

pub type EventSender = broadcast::Sender<SessionEvent>;

pub fn channel() -> EventSender {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

/// Publish an event. Having no subscribers is not an error.
pub(crate) fn publish(events: &EventSender, event: SessionEvent) {
    tracing::debug!(?event, receivers = events.receiver_count(), "session event");
    let _ = events.send(event);
}
