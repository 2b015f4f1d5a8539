use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::mpsc;
use uuid::Uuid;

use quizmate_common::events::{NotificationChannel, RoomEvent};
use quizmate_common::protocol::ServerMessage;

/// Pushes room events to the live connections of subscribed members.
/// Delivery is best-effort: sends are `try_send`, so a slow or gone client
/// simply misses the event and nothing is retried.
#[derive(Default)]
pub struct ClientBroadcaster {
    senders: RwLock<HashMap<Uuid, mpsc::Sender<ServerMessage>>>,
    /// room id -> members watching it
    subscriptions: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
}

impl ClientBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, member_id: Uuid, tx: mpsc::Sender<ServerMessage>) {
        self.senders.write().unwrap().insert(member_id, tx);
    }

    pub fn unregister(&self, member_id: Uuid) {
        self.senders.write().unwrap().remove(&member_id);
        let mut subscriptions = self.subscriptions.write().unwrap();
        for members in subscriptions.values_mut() {
            members.remove(&member_id);
        }
        subscriptions.retain(|_, members| !members.is_empty());
    }

    pub fn subscribe(&self, room_id: Uuid, member_id: Uuid) {
        self.subscriptions
            .write()
            .unwrap()
            .entry(room_id)
            .or_default()
            .insert(member_id);
    }

    pub fn unsubscribe(&self, room_id: Uuid, member_id: Uuid) {
        let mut subscriptions = self.subscriptions.write().unwrap();
        if let Some(members) = subscriptions.get_mut(&room_id) {
            members.remove(&member_id);
            if members.is_empty() {
                subscriptions.remove(&room_id);
            }
        }
    }
}

impl NotificationChannel for ClientBroadcaster {
    fn publish(&self, room_id: Uuid, event: RoomEvent) {
        let members = match self.subscriptions.read().unwrap().get(&room_id) {
            Some(members) => members.clone(),
            None => return,
        };
        let senders = self.senders.read().unwrap();
        for member_id in members {
            if let Some(tx) = senders.get(&member_id) {
                if tx
                    .try_send(ServerMessage::RoomEvent {
                        event: event.clone(),
                    })
                    .is_err()
                {
                    tracing::debug!(%member_id, kind = event.kind.as_str(), "dropped room event");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizmate_common::events::{RoomEventKind, RoomSummary};
    use quizmate_common::room::RoomStatus;

    fn summary(room_id: Uuid) -> RoomSummary {
        RoomSummary {
            id: room_id,
            name: "Test".into(),
            status: RoomStatus::Waiting,
            current_players: 1,
            max_players: 6,
            current_round: 0,
            total_rounds: 10,
        }
    }

    #[test]
    fn test_publish_reaches_subscribers_only() {
        let broadcaster = ClientBroadcaster::new();
        let room_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (alice_tx, mut alice_rx) = mpsc::channel(8);
        let (bob_tx, mut bob_rx) = mpsc::channel(8);
        broadcaster.register(alice, alice_tx);
        broadcaster.register(bob, bob_tx);
        broadcaster.subscribe(room_id, alice);

        broadcaster.publish(
            room_id,
            RoomEvent::new(
                RoomEventKind::PlayerJoined,
                summary(room_id),
                serde_json::json!({}),
            ),
        );

        assert!(matches!(
            alice_rx.try_recv(),
            Ok(ServerMessage::RoomEvent { .. })
        ));
        assert!(bob_rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let broadcaster = ClientBroadcaster::new();
        let room_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);
        broadcaster.register(alice, tx);
        broadcaster.subscribe(room_id, alice);
        broadcaster.unsubscribe(room_id, alice);

        broadcaster.publish(
            room_id,
            RoomEvent::new(
                RoomEventKind::GamePaused,
                summary(room_id),
                serde_json::json!({}),
            ),
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let broadcaster = ClientBroadcaster::new();
        let room_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        broadcaster.register(alice, tx);
        broadcaster.subscribe(room_id, alice);

        for _ in 0..3 {
            broadcaster.publish(
                room_id,
                RoomEvent::new(
                    RoomEventKind::GameResumed,
                    summary(room_id),
                    serde_json::json!({}),
                ),
            );
        }
    }
}
