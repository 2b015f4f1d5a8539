use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const BASE_POINTS: u32 = 10;
pub const QUICK_BONUS: u32 = 5;

/// Quick-answer window for room games.
pub const ROOM_BONUS_WINDOW_SECS: u32 = 15;
/// Quick-answer window for solo play. Deliberately wider than the room
/// window; the two modes have always scored differently.
pub const SOLO_BONUS_WINDOW_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Multiplayer,
    Solo,
}

impl PlayMode {
    pub fn bonus_window_secs(self) -> u32 {
        match self {
            PlayMode::Multiplayer => ROOM_BONUS_WINDOW_SECS,
            PlayMode::Solo => SOLO_BONUS_WINDOW_SECS,
        }
    }
}

/// Case-insensitive, whitespace-trimmed exact match.
pub fn grade(correct_answer: &str, submitted: &str) -> bool {
    submitted.trim().to_lowercase() == correct_answer.trim().to_lowercase()
}

pub fn score_answer(is_correct: bool, time_taken: Option<u32>, mode: PlayMode) -> u32 {
    if !is_correct {
        return 0;
    }
    let mut score = BASE_POINTS;
    if let Some(secs) = time_taken {
        if secs < mode.bonus_window_secs() {
            score += QUICK_BONUS;
        }
    }
    score
}

/// One player's graded answer for one question in one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundAnswer {
    pub member_id: Uuid,
    pub question_id: Uuid,
    pub round_number: u32,
    pub answer_text: String,
    pub is_correct: bool,
    pub time_taken: Option<u32>,
    pub score_earned: u32,
    pub answered_at: DateTime<Utc>,
}
