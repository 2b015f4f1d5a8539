use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member's seat in one room. Seats are never deleted; leaving stamps
/// `left_at` so finished rooms keep their history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeat {
    pub member_id: Uuid,
    pub member_name: String,
    pub is_ready: bool,
    pub current_score: u32,
    pub answers_correct: u32,
    pub answers_incorrect: u32,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl PlayerSeat {
    pub fn new(member_id: Uuid, member_name: String, is_ready: bool) -> Self {
        Self {
            member_id,
            member_name,
            is_ready,
            current_score: 0,
            answers_correct: 0,
            answers_incorrect: 0,
            joined_at: Utc::now(),
            left_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }

    pub fn mark_left(&mut self) {
        self.left_at = Some(Utc::now());
    }

    pub fn record_answer(&mut self, is_correct: bool, score_earned: u32) {
        self.current_score += score_earned;
        if is_correct {
            self.answers_correct += 1;
        } else {
            self.answers_incorrect += 1;
        }
    }

    /// Percentage of correct answers, rounded to two decimal places.
    /// 0 until the first answer lands.
    pub fn accuracy_rate(&self) -> f64 {
        let total = self.answers_correct + self.answers_incorrect;
        if total == 0 {
            return 0.0;
        }
        let rate = f64::from(self.answers_correct) / f64::from(total) * 100.0;
        (rate * 100.0).round() / 100.0
    }
}
