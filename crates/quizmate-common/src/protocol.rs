use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use uuid::Uuid;

use crate::code::RoomCode;
use crate::error::ErrorKind;
use crate::events::RoomEvent;
use crate::lobby::{Paginated, RoomInfo};
use crate::member::Member;
use crate::question::{FullQuestionView, PublicQuestionView};
use crate::room::RoomStatus;

// -- Framing --

pub type Transport = Framed<TcpStream, LengthDelimitedCodec>;

pub fn framed_transport(stream: TcpStream) -> Transport {
    LengthDelimitedCodec::builder()
        .max_frame_length(64 * 1024)
        .new_framed(stream)
}

// -- Client -> Server Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    // Handshake
    Hello {
        member_name: String,
        version: String,
    },

    // Lobby
    CreateRoom {
        name: String,
        category_id: Uuid,
        max_players: Option<u8>,
        total_rounds: Option<u32>,
        time_per_question: Option<u32>,
        settings: Option<serde_json::Map<String, serde_json::Value>>,
    },
    ListRooms {
        status: Option<RoomStatus>,
        category_id: Option<Uuid>,
        page: Option<u32>,
        per_page: Option<u32>,
    },
    FindRoom {
        code: String,
    },
    GetRoom {
        room_id: Uuid,
    },
    JoinRoom {
        room_id: Uuid,
    },
    LeaveRoom {
        room_id: Uuid,
    },
    ToggleReady {
        room_id: Uuid,
    },

    // Session controls (owner-only on the server side)
    StartGame {
        room_id: Uuid,
    },
    NextQuestion {
        room_id: Uuid,
    },
    SkipQuestion {
        room_id: Uuid,
    },
    PauseGame {
        room_id: Uuid,
    },
    ResumeGame {
        room_id: Uuid,
    },
    EndGame {
        room_id: Uuid,
    },

    // Gameplay
    SubmitAnswer {
        room_id: Uuid,
        answer: String,
        time_taken: Option<u32>,
    },

    // Queries
    GetGameState {
        room_id: Uuid,
    },
    GetQuestionResults {
        room_id: Uuid,
    },
    GetGameSummary {
        room_id: Uuid,
    },
    GetRoomLeaderboard {
        room_id: Uuid,
    },

    // Solo play
    SubmitSoloAnswer {
        question_id: Uuid,
        answer: String,
        time_taken: Option<u32>,
    },
    GetSoloStats,
    GetMemberLeaderboard {
        limit: Option<u32>,
    },

    // Connection
    Ping,
    Disconnect,
}

// -- Server -> Client Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    // Handshake
    Welcome {
        member_id: Uuid,
        server_version: String,
    },
    HandshakeError {
        reason: String,
    },

    // Lobby
    RoomCreated {
        room: RoomSnapshot,
    },
    RoomList {
        rooms: Paginated<RoomInfo>,
    },
    RoomDetails {
        room: RoomSnapshot,
    },
    RoomJoined {
        room: RoomSnapshot,
    },
    RoomLeft {
        room_id: Uuid,
    },
    ReadyChanged {
        room_id: Uuid,
        is_ready: bool,
    },

    // Session
    GameStarted {
        room_id: Uuid,
        current_round: u32,
        question: PublicQuestionView,
    },
    QuestionAdvanced {
        room_id: Uuid,
        current_round: u32,
        total_rounds: u32,
        question: PublicQuestionView,
    },
    GamePaused {
        room_id: Uuid,
    },
    GameResumed {
        room_id: Uuid,
    },
    GameEnded {
        room_id: Uuid,
        ended_at: DateTime<Utc>,
    },
    GameFinished {
        room_id: Uuid,
        ended_at: DateTime<Utc>,
    },

    // Gameplay
    AnswerResult {
        room_id: Uuid,
        is_correct: bool,
        score_earned: u32,
        correct_answer: String,
        explanation: Option<String>,
        current_score: u32,
    },

    // Queries
    GameState {
        state: GameStateView,
    },
    QuestionResults {
        results: QuestionResultsView,
    },
    GameSummary {
        summary: GameSummaryView,
    },
    RoomLeaderboard {
        room_id: Uuid,
        entries: Vec<RankingEntry>,
    },

    // Solo play
    SoloResult {
        is_correct: bool,
        score_earned: u32,
        correct_answer: String,
        explanation: Option<String>,
        member_score: u64,
        member_level: u32,
    },
    SoloStats {
        stats: SoloStatsView,
    },
    MemberLeaderboard {
        entries: Vec<Member>,
    },

    // Push
    RoomEvent {
        event: RoomEvent,
    },

    // Errors
    Error {
        code: ErrorKind,
        message: String,
    },

    // Connection
    Pong,
}

// -- Views --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub member_id: Uuid,
    pub member_name: String,
    pub is_ready: bool,
    pub current_score: u32,
    pub answers_correct: u32,
    pub answers_incorrect: u32,
    pub accuracy_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: Uuid,
    pub name: String,
    pub code: RoomCode,
    pub status: RoomStatus,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub current_round: u32,
    pub total_rounds: u32,
    pub time_per_question: u32,
    pub max_players: u8,
    pub current_players: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub players: Vec<SeatView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateView {
    pub room: RoomSnapshot,
    pub current_question: Option<PublicQuestionView>,
    pub my_stats: SeatView,
    pub has_answered_current_question: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecordView {
    pub member_name: String,
    pub answer_text: String,
    pub is_correct: bool,
    pub time_taken: Option<u32>,
    pub score_earned: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStatsView {
    pub total_answers: u32,
    pub correct_answers: u32,
    pub average_time: Option<f64>,
    pub fastest_time: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResultsView {
    pub question: FullQuestionView,
    pub answers: Vec<AnswerRecordView>,
    pub stats: RoundStatsView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub member_id: Uuid,
    pub member_name: String,
    pub final_score: u32,
    pub answers_correct: u32,
    pub answers_incorrect: u32,
    pub accuracy_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceView {
    pub final_score: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub accuracy_rate: f64,
    pub average_time: Option<f64>,
    pub fastest_answer: Option<u32>,
    pub slowest_answer: Option<u32>,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatsView {
    pub total_players: u32,
    pub rounds_played: u32,
    pub duration_minutes: Option<i64>,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSummaryView {
    pub room_id: Uuid,
    pub room_name: String,
    pub status: RoomStatus,
    pub final_rankings: Vec<RankingEntry>,
    pub my_performance: PerformanceView,
    pub game_stats: GameStatsView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoloStatsView {
    pub total_questions_attempted: u32,
    pub total_correct_answers: u32,
    pub total_score: u64,
    pub current_level: u32,
    pub accuracy_rate: f64,
}

// -- Serialization helpers --

pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_vec(msg)?;
    Ok(Bytes::from(json))
}

pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    data: &[u8],
) -> Result<T, serde_json::Error> {
    serde_json::from_slice(data)
}

// -- Transport helpers --

pub async fn send_message<T: Serialize>(
    transport: &mut Transport,
    msg: &T,
) -> anyhow::Result<()> {
    let bytes = serialize_message(msg).map_err(|e| anyhow::anyhow!("serialize error: {}", e))?;
    transport
        .send(bytes.into())
        .await
        .map_err(|e| anyhow::anyhow!("send error: {}", e))
}

pub async fn recv_message<T: for<'de> Deserialize<'de>>(
    transport: &mut Transport,
) -> anyhow::Result<Option<T>> {
    match transport.next().await {
        Some(Ok(frame)) => {
            let msg = deserialize_message(&frame)
                .map_err(|e| anyhow::anyhow!("deserialize error: {}", e))?;
            Ok(Some(msg))
        }
        Some(Err(e)) => Err(anyhow::anyhow!("recv error: {}", e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_serialization() {
        let msg = ClientMessage::Hello {
            member_name: "Alice".into(),
            version: "0.1.0".into(),
        };
        let bytes = serialize_message(&msg).unwrap();
        let deserialized: ClientMessage = deserialize_message(&bytes).unwrap();
        match deserialized {
            ClientMessage::Hello {
                member_name,
                version,
            } => {
                assert_eq!(member_name, "Alice");
                assert_eq!(version, "0.1.0");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_server_message_serialization() {
        let id = Uuid::new_v4();
        let msg = ServerMessage::Welcome {
            member_id: id,
            server_version: "0.1.0".into(),
        };
        let bytes = serialize_message(&msg).unwrap();
        let deserialized: ServerMessage = deserialize_message(&bytes).unwrap();
        match deserialized {
            ServerMessage::Welcome {
                member_id,
                server_version,
            } => {
                assert_eq!(member_id, id);
                assert_eq!(server_version, "0.1.0");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_error_message_serialization() {
        let msg = ServerMessage::Error {
            code: ErrorKind::Capacity,
            message: "room is full".into(),
        };
        let bytes = serialize_message(&msg).unwrap();
        let deserialized: ServerMessage = deserialize_message(&bytes).unwrap();
        match deserialized {
            ServerMessage::Error { code, message } => {
                assert_eq!(code, ErrorKind::Capacity);
                assert_eq!(message, "room is full");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_all_client_messages_serialize() {
        let room_id = Uuid::new_v4();
        let messages = vec![
            ClientMessage::Hello {
                member_name: "Test".into(),
                version: "0.1.0".into(),
            },
            ClientMessage::CreateRoom {
                name: "Room1".into(),
                category_id: Uuid::new_v4(),
                max_players: Some(4),
                total_rounds: None,
                time_per_question: Some(20),
                settings: None,
            },
            ClientMessage::ListRooms {
                status: Some(RoomStatus::Waiting),
                category_id: None,
                page: None,
                per_page: Some(5),
            },
            ClientMessage::FindRoom {
                code: "AB12CD".into(),
            },
            ClientMessage::GetRoom { room_id },
            ClientMessage::JoinRoom { room_id },
            ClientMessage::LeaveRoom { room_id },
            ClientMessage::ToggleReady { room_id },
            ClientMessage::StartGame { room_id },
            ClientMessage::NextQuestion { room_id },
            ClientMessage::SkipQuestion { room_id },
            ClientMessage::PauseGame { room_id },
            ClientMessage::ResumeGame { room_id },
            ClientMessage::EndGame { room_id },
            ClientMessage::SubmitAnswer {
                room_id,
                answer: "Paris".into(),
                time_taken: Some(12),
            },
            ClientMessage::GetGameState { room_id },
            ClientMessage::GetQuestionResults { room_id },
            ClientMessage::GetGameSummary { room_id },
            ClientMessage::GetRoomLeaderboard { room_id },
            ClientMessage::SubmitSoloAnswer {
                question_id: Uuid::new_v4(),
                answer: "42".into(),
                time_taken: None,
            },
            ClientMessage::GetSoloStats,
            ClientMessage::GetMemberLeaderboard { limit: Some(10) },
            ClientMessage::Ping,
            ClientMessage::Disconnect,
        ];

        for msg in &messages {
            let bytes = serialize_message(msg).unwrap();
            let _: ClientMessage = deserialize_message(&bytes).unwrap();
        }
    }
}
