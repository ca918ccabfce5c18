//! Change notifications emitted by the repository.
//!
//! Every successful write publishes a [`ChangeEvent`] on the [`ChangeFeed`].
//! Consumers hold a [`ChangeSubscription`] and drain it when they want to
//! know whether their cached copy of a collection went stale.

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

const FEED_CAPACITY: usize = 64;

/// The independent top-level record sets, plus the session singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Dogs,
    Visits,
    Messages,
    Session,
}

impl Collection {
    /// Logical storage key, before the namespace prefix is applied.
    pub const fn key(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Dogs => "dogs",
            Collection::Visits => "visits",
            Collection::Messages => "messages",
            Collection::Session => "current_user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Seeded,
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    // None for whole-collection events (seeding, logout)
    pub id: Option<String>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, kind: ChangeKind, id: Option<&str>) -> Self {
        Self {
            collection,
            kind,
            id: id.map(str::to_owned),
        }
    }
}

/// Publisher side of the notification channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        debug!(collection = ?event.collection, kind = ?event.kind, id = ?event.id, "change published");
        // A send error only means nobody is subscribed right now
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiver side; each view keeps its own.
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    /// Drain everything pending without blocking.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    // Missed events could touch anything; report every collection as stale
                    debug!(skipped, "change subscription lagged");
                    for collection in [
                        Collection::Users,
                        Collection::Dogs,
                        Collection::Visits,
                        Collection::Messages,
                        Collection::Session,
                    ] {
                        events.push(ChangeEvent::new(collection, ChangeKind::Updated, None));
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// True if any pending event touched one of `collections`.
    pub fn touched(&mut self, collections: &[Collection]) -> bool {
        self.drain()
            .iter()
            .any(|event| collections.contains(&event.collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_see_events_published_after_subscribing() {
        let feed = ChangeFeed::new();
        feed.publish(ChangeEvent::new(Collection::Dogs, ChangeKind::Created, Some("1")));

        let mut sub = feed.subscribe();
        assert!(sub.drain().is_empty());

        feed.publish(ChangeEvent::new(Collection::Visits, ChangeKind::Created, Some("2")));
        feed.publish(ChangeEvent::new(Collection::Dogs, ChangeKind::Deleted, Some("1")));

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].kind, ChangeKind::Deleted);
        assert_eq!(events[1].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_touched_filters_by_collection() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe();

        feed.publish(ChangeEvent::new(Collection::Messages, ChangeKind::Created, Some("3")));
        assert!(!sub.touched(&[Collection::Dogs]));

        feed.publish(ChangeEvent::new(Collection::Dogs, ChangeKind::Updated, Some("3")));
        assert!(sub.touched(&[Collection::Dogs, Collection::Users]));
    }

    #[test]
    fn test_lagged_subscription_reports_everything_stale() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe();
        for i in 0..(FEED_CAPACITY + 10) {
            feed.publish(ChangeEvent::new(Collection::Messages, ChangeKind::Created, Some(i.to_string().as_str())));
        }
        assert!(sub.touched(&[Collection::Session]));
    }
}
