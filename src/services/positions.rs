use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// One stamped position report for a tracked intervention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionUpdate {
    pub intervention_id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub at: DateTime<Utc>,
}

/// Fan-out of professional position reports to tracking sessions.
///
/// Positions are ephemeral: only the latest report per intervention is held
/// so a freshly opened tracking view has something to render before the next
/// report arrives. Nothing is persisted.
pub struct PositionHub {
    latest: RwLock<HashMap<Uuid, PositionUpdate>>,
    sender: broadcast::Sender<PositionUpdate>,
}

impl PositionHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            latest: RwLock::new(HashMap::new()),
            sender,
        }
    }

    /// Record and broadcast a position report.
    pub fn publish(&self, intervention_id: Uuid, lat: f64, lng: f64) -> PositionUpdate {
        let update = PositionUpdate {
            intervention_id,
            lat,
            lng,
            at: Utc::now(),
        };

        if let Ok(mut latest) = self.latest.write() {
            latest.insert(intervention_id, update.clone());
        }

        metrics::counter!("position_updates_total").increment(1);
        let _ = self.sender.send(update.clone());
        update
    }

    /// Latest known position for an intervention, if any was reported.
    pub fn latest(&self, intervention_id: Uuid) -> Option<PositionUpdate> {
        self.latest
            .read()
            .ok()
            .and_then(|m| m.get(&intervention_id).cloned())
    }

    /// Subscribe to all position reports; callers filter by intervention id.
    pub fn subscribe(&self) -> broadcast::Receiver<PositionUpdate> {
        self.sender.subscribe()
    }
}

impl Default for PositionHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_updates_latest_and_broadcasts() {
        let hub = PositionHub::new(8);
        let mut rx = hub.subscribe();
        let id = Uuid::new_v4();

        hub.publish(id, 48.85, 2.35);

        let latest = hub.latest(id).unwrap();
        assert_eq!(latest.lat, 48.85);
        assert_eq!(latest.lng, 2.35);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.intervention_id, id);
        assert_eq!(received, latest);
    }

    #[test]
    fn report_between_subscribe_and_snapshot_is_not_lost() {
        let hub = PositionHub::new(8);
        let id = Uuid::new_v4();

        // Receiver opened first, snapshot read after: a report published in
        // between reaches the receiver and the snapshot both.
        let mut rx = hub.subscribe();
        hub.publish(id, 48.85, 2.35);
        let snapshot = hub.latest(id).unwrap();

        let received = rx.try_recv().unwrap();
        assert_eq!(received, snapshot);
    }

    #[test]
    fn latest_is_per_intervention() {
        let hub = PositionHub::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        hub.publish(a, 48.85, 2.35);
        hub.publish(b, 45.76, 4.83);
        hub.publish(a, 48.84, 2.34);

        assert_eq!(hub.latest(a).unwrap().lat, 48.84);
        assert_eq!(hub.latest(b).unwrap().lat, 45.76);
        assert!(hub.latest(Uuid::new_v4()).is_none());
    }
}
