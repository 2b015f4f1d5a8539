use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::code::RoomCode;
use crate::error::RoomError;
use crate::events::RoomSummary;
use crate::judge::{self, PlayMode, RoundAnswer};
use crate::lobby::RoomInfo;
use crate::member::Member;
use crate::player::PlayerSeat;
use crate::protocol::{
    AnswerRecordView, GameStateView, GameStatsView, GameSummaryView, PerformanceView,
    QuestionResultsView, RankingEntry, RoomSnapshot, RoundStatsView, SeatView,
};
use crate::question::{PublicQuestionView, Question};

pub const MIN_PLAYERS: u8 = 2;
pub const MAX_PLAYERS: u8 = 6;
pub const MIN_ROUNDS: u32 = 5;
pub const MAX_ROUNDS: u32 = 20;
pub const MIN_TIME_PER_QUESTION: u32 = 10;
pub const MAX_TIME_PER_QUESTION: u32 = 120;

pub const DEFAULT_MAX_PLAYERS: u8 = 6;
pub const DEFAULT_TOTAL_ROUNDS: u32 = 10;
pub const DEFAULT_TIME_PER_QUESTION: u32 = 30;

// -- Status --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Paused,
    Finished,
}

impl RoomStatus {
    /// A room still holding its players: waiting, playing or paused.
    pub fn is_active(self) -> bool {
        !matches!(self, RoomStatus::Finished)
    }
}

// -- Configuration --

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub name: String,
    pub category_id: Uuid,
    pub max_players: u8,
    pub total_rounds: u32,
    pub time_per_question: u32,
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl RoomConfig {
    pub fn new(name: String, category_id: Uuid) -> Self {
        Self {
            name,
            category_id,
            max_players: DEFAULT_MAX_PLAYERS,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            time_per_question: DEFAULT_TIME_PER_QUESTION,
            settings: serde_json::Map::new(),
        }
    }

    /// Rejects out-of-range input before anything is created.
    pub fn validate(&self) -> Result<(), RoomError> {
        if self.name.trim().is_empty() {
            return Err(RoomError::EmptyRoomName);
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            return Err(RoomError::MaxPlayersOutOfRange);
        }
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.total_rounds) {
            return Err(RoomError::TotalRoundsOutOfRange);
        }
        if !(MIN_TIME_PER_QUESTION..=MAX_TIME_PER_QUESTION).contains(&self.time_per_question) {
            return Err(RoomError::TimePerQuestionOutOfRange);
        }
        Ok(())
    }
}

// -- Operation outcomes --

#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub new_owner_id: Option<Uuid>,
    pub room_finished: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    RoundsExhausted,
    QuestionsExhausted,
    OwnerLeft,
}

#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    Advanced {
        round: u32,
        question: PublicQuestionView,
    },
    Finished {
        reason: FinishReason,
        ended_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub is_correct: bool,
    pub score_earned: u32,
    pub current_score: u32,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

// -- Room State Machine --

/// One multiplayer game session. The room owns its seats and answers so a
/// single lock around it scopes every read-modify-write as one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub code: RoomCode,
    pub status: RoomStatus,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub current_question: Option<Question>,
    pub current_round: u32,
    pub total_rounds: u32,
    pub time_per_question: u32,
    pub max_players: u8,
    pub current_players: u8,
    pub settings: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub players: Vec<PlayerSeat>,
    pub answers: Vec<RoundAnswer>,
}

impl Room {
    /// The creating member takes the owner seat, already ready.
    pub fn new(id: Uuid, code: RoomCode, owner: &Member, config: RoomConfig) -> Result<Self, RoomError> {
        config.validate()?;
        Ok(Self {
            id,
            name: config.name,
            code,
            status: RoomStatus::Waiting,
            owner_id: owner.id,
            category_id: config.category_id,
            current_question: None,
            current_round: 0,
            total_rounds: config.total_rounds,
            time_per_question: config.time_per_question,
            max_players: config.max_players,
            current_players: 1,
            settings: config.settings,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            players: vec![PlayerSeat::new(owner.id, owner.name.clone(), true)],
            answers: Vec::new(),
        })
    }

    // -- Seat lookups --

    pub fn seat(&self, member_id: Uuid) -> Option<&PlayerSeat> {
        self.players.iter().find(|p| p.member_id == member_id)
    }

    fn seat_mut(&mut self, member_id: Uuid) -> Option<&mut PlayerSeat> {
        self.players.iter_mut().find(|p| p.member_id == member_id)
    }

    pub fn active_seats(&self) -> impl Iterator<Item = &PlayerSeat> {
        self.players.iter().filter(|p| p.is_active())
    }

    pub fn active_player_count(&self) -> usize {
        self.active_seats().count()
    }

    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players
    }

    pub fn is_owner(&self, member_id: Uuid) -> bool {
        self.owner_id == member_id
    }

    pub fn can_start(&self) -> bool {
        self.status == RoomStatus::Waiting
            && self.active_player_count() >= MIN_PLAYERS as usize
            && self.active_seats().all(|p| p.is_ready)
    }

    // -- Membership --

    pub fn join(&mut self, member: &Member) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::RoomNotWaiting);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        // A seat is unique per (room, member); a member who left may not
        // take a second one.
        if self.seat(member.id).is_some() {
            return Err(RoomError::AlreadyInRoom);
        }
        self.players
            .push(PlayerSeat::new(member.id, member.name.clone(), false));
        self.current_players += 1;
        Ok(())
    }

    pub fn leave(&mut self, member_id: Uuid) -> Result<LeaveOutcome, RoomError> {
        let seat = self.seat_mut(member_id).ok_or(RoomError::NotInRoom)?;
        if !seat.is_active() {
            return Err(RoomError::AlreadyLeft);
        }
        seat.mark_left();
        self.current_players = self.current_players.saturating_sub(1);

        let mut outcome = LeaveOutcome {
            new_owner_id: None,
            room_finished: None,
        };
        if self.owner_id == member_id {
            match self.promote_next_owner() {
                Some(next) => outcome.new_owner_id = Some(next),
                None => outcome.room_finished = Some(self.finish()),
            }
        }
        Ok(outcome)
    }

    /// Deterministic succession: the earliest-joined remaining active player.
    fn promote_next_owner(&mut self) -> Option<Uuid> {
        let next = self
            .active_seats()
            .min_by_key(|p| p.joined_at)
            .map(|p| p.member_id)?;
        self.owner_id = next;
        Some(next)
    }

    pub fn toggle_ready(&mut self, member_id: Uuid) -> Result<bool, RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::RoomNotWaiting);
        }
        let seat = self
            .seat_mut(member_id)
            .filter(|p| p.is_active())
            .ok_or(RoomError::NotInRoom)?;
        seat.is_ready = !seat.is_ready;
        Ok(seat.is_ready)
    }

    // -- Session controls --

    /// `question` is the pre-selected first question, or `None` when the
    /// category is empty; checking it last keeps the error precedence
    /// owner -> state -> readiness -> question pool.
    pub fn start(
        &mut self,
        requester: Uuid,
        question: Option<Question>,
    ) -> Result<PublicQuestionView, RoomError> {
        if !self.is_owner(requester) {
            return Err(RoomError::NotOwner);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::RoomNotWaiting);
        }
        if self.active_player_count() < MIN_PLAYERS as usize {
            return Err(RoomError::NotEnoughPlayers);
        }
        if !self.active_seats().all(|p| p.is_ready) {
            return Err(RoomError::PlayersNotReady);
        }
        let question = question.ok_or(RoomError::NoQuestionsAvailable)?;
        let view = question.public_view();
        self.status = RoomStatus::Playing;
        self.current_round = 1;
        self.current_question = Some(question);
        self.started_at = Some(Utc::now());
        Ok(view)
    }

    pub fn pause(&mut self, requester: Uuid) -> Result<(), RoomError> {
        if !self.is_owner(requester) {
            return Err(RoomError::NotOwner);
        }
        if self.status != RoomStatus::Playing {
            return Err(RoomError::GameNotActive);
        }
        self.status = RoomStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self, requester: Uuid) -> Result<(), RoomError> {
        if !self.is_owner(requester) {
            return Err(RoomError::NotOwner);
        }
        if self.status != RoomStatus::Paused {
            return Err(RoomError::GameNotPaused);
        }
        self.status = RoomStatus::Playing;
        Ok(())
    }

    pub fn end(&mut self, requester: Uuid) -> Result<DateTime<Utc>, RoomError> {
        if !self.is_owner(requester) {
            return Err(RoomError::NotOwner);
        }
        if self.status == RoomStatus::Finished {
            return Err(RoomError::GameAlreadyFinished);
        }
        Ok(self.finish())
    }

    fn finish(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.status = RoomStatus::Finished;
        self.ended_at = Some(now);
        now
    }

    // -- Rounds --

    /// Question ids already answered in this room, across all rounds.
    pub fn used_question_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.answers.iter().map(|a| a.question_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Advance to `question`, or finish the room when the round target is
    /// reached or the pool ran dry (`question == None`).
    pub fn advance(
        &mut self,
        requester: Uuid,
        question: Option<Question>,
    ) -> Result<AdvanceOutcome, RoomError> {
        if !self.is_owner(requester) {
            return Err(RoomError::NotOwner);
        }
        if self.status != RoomStatus::Playing {
            return Err(RoomError::GameNotActive);
        }
        if self.current_round >= self.total_rounds {
            return Ok(AdvanceOutcome::Finished {
                reason: FinishReason::RoundsExhausted,
                ended_at: self.finish(),
            });
        }
        match question {
            None => Ok(AdvanceOutcome::Finished {
                reason: FinishReason::QuestionsExhausted,
                ended_at: self.finish(),
            }),
            Some(question) => {
                let view = question.public_view();
                self.current_round += 1;
                self.current_question = Some(question);
                Ok(AdvanceOutcome::Advanced {
                    round: self.current_round,
                    question: view,
                })
            }
        }
    }

    // -- Answers --

    pub fn submit_answer(
        &mut self,
        member_id: Uuid,
        answer_text: &str,
        time_taken: Option<u32>,
    ) -> Result<SubmitOutcome, RoomError> {
        if answer_text.trim().is_empty() {
            return Err(RoomError::EmptyAnswer);
        }
        if self.status != RoomStatus::Playing {
            return Err(RoomError::GameNotActive);
        }
        if self.seat(member_id).filter(|p| p.is_active()).is_none() {
            return Err(RoomError::NotInRoom);
        }
        let (question_id, correct_answer, explanation) = {
            let question = self
                .current_question
                .as_ref()
                .ok_or(RoomError::NoCurrentQuestion)?;
            (
                question.id,
                question.correct_answer.clone(),
                question.explanation.clone(),
            )
        };
        if self.answers.iter().any(|a| {
            a.member_id == member_id
                && a.question_id == question_id
                && a.round_number == self.current_round
        }) {
            return Err(RoomError::AlreadyAnswered);
        }

        let is_correct = judge::grade(&correct_answer, answer_text);
        let score_earned = judge::score_answer(is_correct, time_taken, PlayMode::Multiplayer);

        self.answers.push(RoundAnswer {
            member_id,
            question_id,
            round_number: self.current_round,
            answer_text: answer_text.to_string(),
            is_correct,
            time_taken,
            score_earned,
            answered_at: Utc::now(),
        });
        let seat = self
            .seat_mut(member_id)
            .ok_or(RoomError::NotInRoom)?;
        seat.record_answer(is_correct, score_earned);
        let current_score = seat.current_score;

        Ok(SubmitOutcome {
            is_correct,
            score_earned,
            current_score,
            correct_answer,
            explanation,
        })
    }

    pub fn has_answered_current_question(&self, member_id: Uuid) -> bool {
        match &self.current_question {
            Some(question) => self.answers.iter().any(|a| {
                a.member_id == member_id
                    && a.question_id == question.id
                    && a.round_number == self.current_round
            }),
            None => false,
        }
    }

    // -- Projections --

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            current_players: self.current_players,
            max_players: self.max_players,
            current_round: self.current_round,
            total_rounds: self.total_rounds,
        }
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            status: self.status,
            category_id: self.category_id,
            player_count: self.current_players,
            max_players: self.max_players,
            created_at: self.created_at,
        }
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            status: self.status,
            owner_id: self.owner_id,
            category_id: self.category_id,
            current_round: self.current_round,
            total_rounds: self.total_rounds,
            time_per_question: self.time_per_question,
            max_players: self.max_players,
            current_players: self.current_players,
            created_at: self.created_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
            players: self.active_seats().map(seat_view).collect(),
        }
    }

    // -- Queries (membership required) --

    fn require_seat(&self, member_id: Uuid) -> Result<&PlayerSeat, RoomError> {
        self.seat(member_id).ok_or(RoomError::NotInRoom)
    }

    pub fn game_state(&self, member_id: Uuid) -> Result<GameStateView, RoomError> {
        let seat = self.require_seat(member_id)?;
        let my_stats = seat_view(seat);
        let has_answered = if self.status == RoomStatus::Playing && self.current_question.is_some()
        {
            Some(self.has_answered_current_question(member_id))
        } else {
            None
        };
        Ok(GameStateView {
            room: self.snapshot(),
            current_question: self.current_question.as_ref().map(Question::public_view),
            my_stats,
            has_answered_current_question: has_answered,
        })
    }

    /// Post-round view of the current question: full content plus every
    /// answer submitted for it this round.
    pub fn question_results(&self, member_id: Uuid) -> Result<QuestionResultsView, RoomError> {
        self.require_seat(member_id)?;
        let question = self
            .current_question
            .as_ref()
            .ok_or(RoomError::NoCurrentQuestion)?;

        let round_answers: Vec<&RoundAnswer> = self
            .answers
            .iter()
            .filter(|a| a.question_id == question.id && a.round_number == self.current_round)
            .collect();

        let times: Vec<u32> = round_answers.iter().filter_map(|a| a.time_taken).collect();
        let stats = RoundStatsView {
            total_answers: round_answers.len() as u32,
            correct_answers: round_answers.iter().filter(|a| a.is_correct).count() as u32,
            average_time: average(&times),
            fastest_time: times.iter().copied().min(),
        };

        let answers = round_answers
            .iter()
            .map(|a| AnswerRecordView {
                member_name: self
                    .seat(a.member_id)
                    .map(|p| p.member_name.clone())
                    .unwrap_or_default(),
                answer_text: a.answer_text.clone(),
                is_correct: a.is_correct,
                time_taken: a.time_taken,
                score_earned: a.score_earned,
            })
            .collect();

        Ok(QuestionResultsView {
            question: question.full_view(),
            answers,
            stats,
        })
    }

    /// Active seats ranked by score, ties broken by correct answers.
    pub fn leaderboard(&self) -> Vec<RankingEntry> {
        let mut seats: Vec<&PlayerSeat> = self.active_seats().collect();
        seats.sort_by(|a, b| {
            b.current_score
                .cmp(&a.current_score)
                .then(b.answers_correct.cmp(&a.answers_correct))
        });
        seats
            .iter()
            .enumerate()
            .map(|(i, p)| RankingEntry {
                rank: i as u32 + 1,
                member_id: p.member_id,
                member_name: p.member_name.clone(),
                final_score: p.current_score,
                answers_correct: p.answers_correct,
                answers_incorrect: p.answers_incorrect,
                accuracy_rate: p.accuracy_rate(),
            })
            .collect()
    }

    pub fn game_summary(&self, member_id: Uuid) -> Result<GameSummaryView, RoomError> {
        let seat = self.require_seat(member_id)?;
        let rankings = self.leaderboard();
        let my_rank = rankings
            .iter()
            .find(|r| r.member_id == member_id)
            .map(|r| r.rank);

        let my_answers: Vec<&RoundAnswer> = self
            .answers
            .iter()
            .filter(|a| a.member_id == member_id)
            .collect();
        let my_times: Vec<u32> = my_answers.iter().filter_map(|a| a.time_taken).collect();
        let my_performance = PerformanceView {
            final_score: seat.current_score,
            total_questions: my_answers.len() as u32,
            correct_answers: my_answers.iter().filter(|a| a.is_correct).count() as u32,
            accuracy_rate: seat.accuracy_rate(),
            average_time: average(&my_times),
            fastest_answer: my_times.iter().copied().min(),
            slowest_answer: my_times.iter().copied().max(),
            rank: my_rank,
        };

        let game_stats = GameStatsView {
            total_players: rankings.len() as u32,
            rounds_played: self.current_round,
            duration_minutes: match (self.started_at, self.ended_at) {
                (Some(started), Some(ended)) => Some((ended - started).num_minutes()),
                _ => None,
            },
            category_id: self.category_id,
        };

        Ok(GameSummaryView {
            room_id: self.id,
            room_name: self.name.clone(),
            status: self.status,
            final_rankings: rankings,
            my_performance,
            game_stats,
        })
    }
}

fn seat_view(seat: &PlayerSeat) -> SeatView {
    SeatView {
        member_id: seat.member_id,
        member_name: seat.member_name.clone(),
        is_ready: seat.is_ready,
        current_score: seat.current_score,
        answers_correct: seat.answers_correct,
        answers_incorrect: seat.answers_incorrect,
        accuracy_rate: seat.accuracy_rate(),
    }
}

fn average(times: &[u32]) -> Option<f64> {
    if times.is_empty() {
        return None;
    }
    Some(times.iter().map(|&t| f64::from(t)).sum::<f64>() / times.len() as f64)
}
