use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::RoomStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomEventKind {
    #[serde(rename = "player.joined")]
    PlayerJoined,
    #[serde(rename = "player.left")]
    PlayerLeft,
    #[serde(rename = "player.ready_changed")]
    PlayerReadyChanged,
    #[serde(rename = "game.started")]
    GameStarted,
    #[serde(rename = "round.advanced")]
    RoundAdvanced,
    #[serde(rename = "answer.submitted")]
    AnswerSubmitted,
    #[serde(rename = "game.paused")]
    GamePaused,
    #[serde(rename = "game.resumed")]
    GameResumed,
    #[serde(rename = "game.ended")]
    GameEnded,
    #[serde(rename = "game.finished")]
    GameFinished,
}

impl RoomEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomEventKind::PlayerJoined => "player.joined",
            RoomEventKind::PlayerLeft => "player.left",
            RoomEventKind::PlayerReadyChanged => "player.ready_changed",
            RoomEventKind::GameStarted => "game.started",
            RoomEventKind::RoundAdvanced => "round.advanced",
            RoomEventKind::AnswerSubmitted => "answer.submitted",
            RoomEventKind::GamePaused => "game.paused",
            RoomEventKind::GameResumed => "game.resumed",
            RoomEventKind::GameEnded => "game.ended",
            RoomEventKind::GameFinished => "game.finished",
        }
    }
}

/// Room header carried by every event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub status: RoomStatus,
    pub current_players: u8,
    pub max_players: u8,
    pub current_round: u32,
    pub total_rounds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent {
    pub kind: RoomEventKind,
    pub room: RoomSummary,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl RoomEvent {
    pub fn new(kind: RoomEventKind, room: RoomSummary, data: serde_json::Value) -> Self {
        Self {
            kind,
            room,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Fire-and-forget push of room events to connected clients. Delivery is
/// at-most-once, best-effort; implementations must not block and must not
/// retry failed sends.
pub trait NotificationChannel: Send + Sync {
    fn publish(&self, room_id: Uuid, event: RoomEvent);
}

/// Discards every event. Used by tests and headless tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChannel;

impl NotificationChannel for NullChannel {
    fn publish(&self, _room_id: Uuid, _event: RoomEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        let json = serde_json::to_string(&RoomEventKind::PlayerReadyChanged).unwrap();
        assert_eq!(json, "\"player.ready_changed\"");
        let back: RoomEventKind = serde_json::from_str("\"game.finished\"").unwrap();
        assert_eq!(back, RoomEventKind::GameFinished);
    }

    #[test]
    fn test_as_str_matches_serde_names() {
        for kind in [
            RoomEventKind::PlayerJoined,
            RoomEventKind::PlayerLeft,
            RoomEventKind::PlayerReadyChanged,
            RoomEventKind::GameStarted,
            RoomEventKind::RoundAdvanced,
            RoomEventKind::AnswerSubmitted,
            RoomEventKind::GamePaused,
            RoomEventKind::GameResumed,
            RoomEventKind::GameEnded,
            RoomEventKind::GameFinished,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
