use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cumulative score needed per level step.
pub const POINTS_PER_LEVEL: u64 = 100;

pub fn level_for_score(score: u64) -> u32 {
    (score / POINTS_PER_LEVEL) as u32 + 1
}

/// Identity record from the member directory. The room core only reads
/// these; cumulative score and level are touched by solo play alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub score: u64,
    pub level: u32,
}

impl Member {
    pub fn new(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            level: 1,
        }
    }

    pub fn credit(&mut self, points: u64) {
        self.score += points;
        self.level = level_for_score(self.score);
    }
}
