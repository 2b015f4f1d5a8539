use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use quizmate_common::code::RoomCode;
use quizmate_common::error::RoomError;
use quizmate_common::events::{NotificationChannel, RoomEvent, RoomEventKind};
use quizmate_common::lobby::{Page, Paginated, RoomFilter, RoomInfo};
use quizmate_common::member::Member;
use quizmate_common::protocol::{
    GameStateView, GameSummaryView, QuestionResultsView, RankingEntry, RoomSnapshot,
};
use quizmate_common::question::PublicQuestionView;
use quizmate_common::room::{
    AdvanceOutcome, FinishReason, LeaveOutcome, Room, RoomConfig, RoomStatus, SubmitOutcome,
};

use crate::store::QuestionStore;

#[derive(Debug, Clone)]
pub enum AdvanceResult {
    Advanced {
        current_round: u32,
        total_rounds: u32,
        question: PublicQuestionView,
    },
    Finished {
        ended_at: DateTime<Utc>,
    },
}

/// The game-room coordinator. Every room sits behind its own mutex, so one
/// room operation is one serializable transaction and unrelated rooms never
/// contend. Cross-room state (codes, who is seated where) has its own locks,
/// always taken before any room lock.
pub struct GameService {
    rooms: RwLock<HashMap<Uuid, Arc<Mutex<Room>>>>,
    codes: Mutex<HashMap<RoomCode, Uuid>>,
    /// member -> the active room holding their seat
    active_members: Mutex<HashMap<Uuid, Uuid>>,
    store: Arc<dyn QuestionStore>,
    channel: Arc<dyn NotificationChannel>,
}

impl GameService {
    pub fn new(store: Arc<dyn QuestionStore>, channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            codes: Mutex::new(HashMap::new()),
            active_members: Mutex::new(HashMap::new()),
            store,
            channel,
        }
    }

    fn room_arc(&self, room_id: Uuid) -> Result<Arc<Mutex<Room>>, RoomError> {
        self.rooms
            .read()
            .unwrap()
            .get(&room_id)
            .cloned()
            .ok_or(RoomError::RoomNotFound)
    }

    /// Which active room holds this member's seat, if any. Entries pointing
    /// at finished rooms or abandoned seats are dropped on sight.
    fn occupied_room(&self, active: &mut HashMap<Uuid, Uuid>, member_id: Uuid) -> Option<Uuid> {
        let room_id = *active.get(&member_id)?;
        if let Some(room) = self.rooms.read().unwrap().get(&room_id).cloned() {
            let room = room.lock().unwrap();
            let seated = room.seat(member_id).is_some_and(|s| s.is_active());
            if room.status.is_active() && seated {
                return Some(room_id);
            }
        }
        active.remove(&member_id);
        None
    }

    /// Release the membership index entries of everyone still seated in a
    /// room that just finished.
    fn release_seats(&self, active: &mut HashMap<Uuid, Uuid>, room: &Room) {
        for seat in room.active_seats() {
            if active.get(&seat.member_id) == Some(&room.id) {
                active.remove(&seat.member_id);
            }
        }
    }

    /// Codes are sampled until one is free and reserved under the code lock,
    /// so two concurrent creates can never share one.
    fn reserve_code(&self, room_id: Uuid) -> RoomCode {
        let mut codes = self.codes.lock().unwrap();
        let mut rng = rand::thread_rng();
        loop {
            let code = RoomCode::generate(&mut rng);
            if !codes.contains_key(&code) {
                codes.insert(code.clone(), room_id);
                return code;
            }
        }
    }

    fn publish(&self, room: &Room, kind: RoomEventKind, data: serde_json::Value) {
        self.channel
            .publish(room.id, RoomEvent::new(kind, room.summary(), data));
    }

    // -- Registry --

    pub fn create_room(&self, owner: &Member, config: RoomConfig) -> Result<RoomSnapshot, RoomError> {
        config.validate()?;
        let mut active = self.active_members.lock().unwrap();
        if let Some(existing) = self.occupied_room(&mut active, owner.id) {
            let owns = self
                .room_arc(existing)
                .map(|room| room.lock().unwrap().is_owner(owner.id))
                .unwrap_or(false);
            return Err(if owns {
                RoomError::OwnerHasActiveRoom
            } else {
                RoomError::InAnotherRoom
            });
        }

        let room_id = Uuid::new_v4();
        let code = self.reserve_code(room_id);
        let room = Room::new(room_id, code, owner, config)?;
        let snapshot = room.snapshot();
        tracing::info!(%room_id, code = %room.code, owner = %owner.name, "room created");
        self.rooms
            .write()
            .unwrap()
            .insert(room_id, Arc::new(Mutex::new(room)));
        active.insert(owner.id, room_id);
        Ok(snapshot)
    }

    pub fn get_room(&self, room_id: Uuid) -> Result<RoomSnapshot, RoomError> {
        Ok(self.room_arc(room_id)?.lock().unwrap().snapshot())
    }

    pub fn find_by_code(&self, raw: &str) -> Result<RoomSnapshot, RoomError> {
        let code = RoomCode::parse(raw)?;
        let room_id = *self
            .codes
            .lock()
            .unwrap()
            .get(&code)
            .ok_or(RoomError::RoomNotFound)?;
        self.get_room(room_id)
    }

    pub fn list_rooms(&self, filter: &RoomFilter, page: Page) -> Paginated<RoomInfo> {
        let rooms: Vec<Arc<Mutex<Room>>> = self.rooms.read().unwrap().values().cloned().collect();
        let mut infos: Vec<RoomInfo> = rooms.iter().map(|r| r.lock().unwrap().info()).collect();
        infos.retain(|info| {
            if let Some(status) = filter.status {
                if info.status != status {
                    return false;
                }
            }
            if let Some(category_id) = filter.category_id {
                if info.category_id != category_id {
                    return false;
                }
            }
            // full rooms are useless in a join-a-room listing
            if matches!(filter.status, None | Some(RoomStatus::Waiting))
                && info.player_count >= info.max_players
            {
                return false;
            }
            true
        });
        infos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = infos.len() as u64;
        let items = infos
            .into_iter()
            .skip(page.offset())
            .take(page.per_page as usize)
            .collect();
        Paginated {
            items,
            page: page.page,
            per_page: page.per_page,
            total,
        }
    }

    // -- Membership --

    pub fn join_room(&self, room_id: Uuid, member: &Member) -> Result<RoomSnapshot, RoomError> {
        let mut active = self.active_members.lock().unwrap();
        if let Some(existing) = self.occupied_room(&mut active, member.id) {
            return Err(if existing == room_id {
                RoomError::AlreadyInRoom
            } else {
                RoomError::InAnotherRoom
            });
        }
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        room.join(member)?;
        active.insert(member.id, room_id);
        self.publish(
            &room,
            RoomEventKind::PlayerJoined,
            json!({ "member_id": member.id, "member_name": member.name }),
        );
        Ok(room.snapshot())
    }

    pub fn leave_room(&self, room_id: Uuid, member_id: Uuid) -> Result<LeaveOutcome, RoomError> {
        let mut active = self.active_members.lock().unwrap();
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        let member_name = room
            .seat(member_id)
            .map(|s| s.member_name.clone())
            .unwrap_or_default();
        let outcome = room.leave(member_id)?;
        active.remove(&member_id);
        self.publish(
            &room,
            RoomEventKind::PlayerLeft,
            json!({
                "member_id": member_id,
                "member_name": member_name,
                "new_owner_id": outcome.new_owner_id,
            }),
        );
        if let Some(ended_at) = outcome.room_finished {
            tracing::info!(room_id = %room.id, "room finished, last player left");
            self.publish(
                &room,
                RoomEventKind::GameFinished,
                json!({ "reason": FinishReason::OwnerLeft, "ended_at": ended_at }),
            );
        }
        Ok(outcome)
    }

    pub fn toggle_ready(&self, room_id: Uuid, member_id: Uuid) -> Result<bool, RoomError> {
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        let is_ready = room.toggle_ready(member_id)?;
        self.publish(
            &room,
            RoomEventKind::PlayerReadyChanged,
            json!({ "member_id": member_id, "is_ready": is_ready }),
        );
        Ok(is_ready)
    }

    /// The room a member actively occupies right now, if any. Used to clean
    /// up when a connection drops.
    pub fn active_room_of(&self, member_id: Uuid) -> Option<Uuid> {
        let mut active = self.active_members.lock().unwrap();
        self.occupied_room(&mut active, member_id)
    }

    // -- Session controls --

    pub fn start_game(
        &self,
        room_id: Uuid,
        requester: Uuid,
    ) -> Result<(u32, PublicQuestionView), RoomError> {
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        let first = self.store.random_excluding(room.category_id, &[]);
        let question = room.start(requester, first)?;
        tracing::info!(room_id = %room.id, code = %room.code, "game started");
        self.publish(
            &room,
            RoomEventKind::GameStarted,
            json!({
                "current_round": room.current_round,
                "question": &question,
                "started_at": room.started_at,
            }),
        );
        Ok((room.current_round, question))
    }

    pub fn submit_answer(
        &self,
        room_id: Uuid,
        member_id: Uuid,
        answer: &str,
        time_taken: Option<u32>,
    ) -> Result<SubmitOutcome, RoomError> {
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        let outcome = room.submit_answer(member_id, answer, time_taken)?;
        // other players learn the outcome, never the answer text
        self.publish(
            &room,
            RoomEventKind::AnswerSubmitted,
            json!({
                "member_id": member_id,
                "is_correct": outcome.is_correct,
                "score_earned": outcome.score_earned,
                "current_score": outcome.current_score,
            }),
        );
        Ok(outcome)
    }

    pub fn advance_question(
        &self,
        room_id: Uuid,
        requester: Uuid,
    ) -> Result<AdvanceResult, RoomError> {
        let mut active = self.active_members.lock().unwrap();
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        let used = room.used_question_ids();
        let next = self.store.random_excluding(room.category_id, &used);
        match room.advance(requester, next)? {
            AdvanceOutcome::Advanced { round, question } => {
                self.publish(
                    &room,
                    RoomEventKind::RoundAdvanced,
                    json!({ "current_round": round, "question": &question }),
                );
                Ok(AdvanceResult::Advanced {
                    current_round: round,
                    total_rounds: room.total_rounds,
                    question,
                })
            }
            AdvanceOutcome::Finished { reason, ended_at } => {
                self.release_seats(&mut active, &room);
                tracing::info!(room_id = %room.id, ?reason, "room finished");
                self.publish(
                    &room,
                    RoomEventKind::GameFinished,
                    json!({ "reason": reason, "ended_at": ended_at }),
                );
                Ok(AdvanceResult::Finished { ended_at })
            }
        }
    }

    /// Identical contract to `advance_question`; the client verb differs.
    pub fn skip_question(&self, room_id: Uuid, requester: Uuid) -> Result<AdvanceResult, RoomError> {
        self.advance_question(room_id, requester)
    }

    pub fn pause_game(&self, room_id: Uuid, requester: Uuid) -> Result<(), RoomError> {
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        room.pause(requester)?;
        self.publish(&room, RoomEventKind::GamePaused, json!({}));
        Ok(())
    }

    pub fn resume_game(&self, room_id: Uuid, requester: Uuid) -> Result<(), RoomError> {
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        room.resume(requester)?;
        self.publish(&room, RoomEventKind::GameResumed, json!({}));
        Ok(())
    }

    pub fn end_game(&self, room_id: Uuid, requester: Uuid) -> Result<DateTime<Utc>, RoomError> {
        let mut active = self.active_members.lock().unwrap();
        let room = self.room_arc(room_id)?;
        let mut room = room.lock().unwrap();
        let ended_at = room.end(requester)?;
        self.release_seats(&mut active, &room);
        tracing::info!(room_id = %room.id, "game ended by owner");
        self.publish(
            &room,
            RoomEventKind::GameEnded,
            json!({ "ended_at": ended_at }),
        );
        Ok(ended_at)
    }

    // -- Queries --

    pub fn game_state(&self, room_id: Uuid, member_id: Uuid) -> Result<GameStateView, RoomError> {
        self.room_arc(room_id)?.lock().unwrap().game_state(member_id)
    }

    pub fn question_results(
        &self,
        room_id: Uuid,
        member_id: Uuid,
    ) -> Result<QuestionResultsView, RoomError> {
        self.room_arc(room_id)?
            .lock()
            .unwrap()
            .question_results(member_id)
    }

    pub fn game_summary(
        &self,
        room_id: Uuid,
        member_id: Uuid,
    ) -> Result<GameSummaryView, RoomError> {
        self.room_arc(room_id)?
            .lock()
            .unwrap()
            .game_summary(member_id)
    }

    pub fn room_leaderboard(&self, room_id: Uuid) -> Result<Vec<RankingEntry>, RoomError> {
        Ok(self.room_arc(room_id)?.lock().unwrap().leaderboard())
    }
}
