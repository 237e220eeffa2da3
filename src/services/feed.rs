use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Entity collections covered by the change feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    Interventions,
    Invoices,
    Notifications,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
}

/// One record mutation, pushed to every dashboard session of the owning
/// professional. Carries only identity, never the row itself: subscribers
/// re-query the collection on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub action: ChangeAction,
    pub id: Uuid,
    pub owner_id: Uuid,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, action: ChangeAction, id: Uuid, owner_id: Uuid) -> Self {
        Self {
            collection,
            action,
            id,
            owner_id,
            at: Utc::now(),
        }
    }
}

/// Broadcast fan-out of record mutations. Bounded channel: a subscriber that
/// lags past capacity drops events and is expected to re-query on resume.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: Arc<broadcast::Sender<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all subscribers. No active receivers is fine.
    pub fn publish(&self, event: ChangeEvent) {
        metrics::counter!("change_events_total").increment(1);
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_subscriber() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();

        let id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        feed.publish(ChangeEvent::new(
            Collection::Interventions,
            ChangeAction::Insert,
            id,
            owner,
        ));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.collection, Collection::Interventions);
        assert_eq!(event.action, ChangeAction::Insert);
        assert_eq!(event.id, id);
        assert_eq!(event.owner_id, owner);
    }

    #[test]
    fn every_subscriber_sees_every_event() {
        let feed = ChangeFeed::new(8);
        let mut rx1 = feed.subscribe();
        let mut rx2 = feed.subscribe();

        feed.publish(ChangeEvent::new(
            Collection::Invoices,
            ChangeAction::Update,
            Uuid::new_v4(),
            Uuid::new_v4(),
        ));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let feed = ChangeFeed::default();
        feed.publish(ChangeEvent::new(
            Collection::Notifications,
            ChangeAction::Insert,
            Uuid::new_v4(),
            Uuid::new_v4(),
        ));
    }

    #[test]
    fn collection_serializes_snake_case() {
        let event = ChangeEvent::new(
            Collection::Interventions,
            ChangeAction::Delete,
            Uuid::nil(),
            Uuid::nil(),
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["collection"], "interventions");
        assert_eq!(json["action"], "delete");
    }
}
