use uuid::Uuid;

use quizmate_common::error::RoomError;
use quizmate_common::lobby::{Page, RoomFilter};
use quizmate_common::member::Member;
use quizmate_common::protocol::{ClientMessage, ServerMessage};
use quizmate_common::room::{
    RoomConfig, DEFAULT_MAX_PLAYERS, DEFAULT_TIME_PER_QUESTION, DEFAULT_TOTAL_ROUNDS,
};

use crate::server::SharedState;
use crate::service::AdvanceResult;

pub async fn handle_message(
    member_id: Uuid,
    msg: ClientMessage,
    state: &SharedState,
) -> anyhow::Result<()> {
    match msg {
        // The handshake already happened; a stray Hello is ignored.
        ClientMessage::Hello { .. } => {}

        ClientMessage::CreateRoom {
            name,
            category_id,
            max_players,
            total_rounds,
            time_per_question,
            settings,
        } => {
            let member = match require_member(member_id, state).await {
                Some(member) => member,
                None => return Ok(()),
            };
            let config = RoomConfig {
                name,
                category_id,
                max_players: max_players.unwrap_or(DEFAULT_MAX_PLAYERS),
                total_rounds: total_rounds.unwrap_or(DEFAULT_TOTAL_ROUNDS),
                time_per_question: time_per_question.unwrap_or(DEFAULT_TIME_PER_QUESTION),
                settings: settings.unwrap_or_default(),
            };
            match state.service.create_room(&member, config) {
                Ok(room) => {
                    state.broadcaster.subscribe(room.id, member_id);
                    send_to_member(member_id, ServerMessage::RoomCreated { room }, state).await;
                }
                Err(e) => send_error(member_id, &e, state).await,
            }
        }

        ClientMessage::ListRooms {
            status,
            category_id,
            page,
            per_page,
        } => {
            let filter = RoomFilter {
                status,
                category_id,
            };
            let rooms = state.service.list_rooms(&filter, Page::new(page, per_page));
            send_to_member(member_id, ServerMessage::RoomList { rooms }, state).await;
        }

        ClientMessage::FindRoom { code } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .find_by_code(&code)
                    .map(|room| ServerMessage::RoomDetails { room }),
            )
            .await;
        }

        ClientMessage::GetRoom { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .get_room(room_id)
                    .map(|room| ServerMessage::RoomDetails { room }),
            )
            .await;
        }

        ClientMessage::JoinRoom { room_id } => {
            let member = match require_member(member_id, state).await {
                Some(member) => member,
                None => return Ok(()),
            };
            match state.service.join_room(room_id, &member) {
                Ok(room) => {
                    state.broadcaster.subscribe(room_id, member_id);
                    send_to_member(member_id, ServerMessage::RoomJoined { room }, state).await;
                }
                Err(e) => send_error(member_id, &e, state).await,
            }
        }

        ClientMessage::LeaveRoom { room_id } => {
            match state.service.leave_room(room_id, member_id) {
                Ok(_) => {
                    state.broadcaster.unsubscribe(room_id, member_id);
                    send_to_member(member_id, ServerMessage::RoomLeft { room_id }, state).await;
                }
                Err(e) => send_error(member_id, &e, state).await,
            }
        }

        ClientMessage::ToggleReady { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .toggle_ready(room_id, member_id)
                    .map(|is_ready| ServerMessage::ReadyChanged { room_id, is_ready }),
            )
            .await;
        }

        ClientMessage::StartGame { room_id } => {
            reply(
                member_id,
                state,
                state.service.start_game(room_id, member_id).map(
                    |(current_round, question)| ServerMessage::GameStarted {
                        room_id,
                        current_round,
                        question,
                    },
                ),
            )
            .await;
        }

        ClientMessage::NextQuestion { room_id } => {
            let result = state.service.advance_question(room_id, member_id);
            reply(member_id, state, result.map(|r| advance_reply(room_id, r))).await;
        }

        ClientMessage::SkipQuestion { room_id } => {
            let result = state.service.skip_question(room_id, member_id);
            reply(member_id, state, result.map(|r| advance_reply(room_id, r))).await;
        }

        ClientMessage::PauseGame { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .pause_game(room_id, member_id)
                    .map(|()| ServerMessage::GamePaused { room_id }),
            )
            .await;
        }

        ClientMessage::ResumeGame { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .resume_game(room_id, member_id)
                    .map(|()| ServerMessage::GameResumed { room_id }),
            )
            .await;
        }

        ClientMessage::EndGame { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .end_game(room_id, member_id)
                    .map(|ended_at| ServerMessage::GameEnded { room_id, ended_at }),
            )
            .await;
        }

        ClientMessage::SubmitAnswer {
            room_id,
            answer,
            time_taken,
        } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .submit_answer(room_id, member_id, &answer, time_taken)
                    .map(|outcome| ServerMessage::AnswerResult {
                        room_id,
                        is_correct: outcome.is_correct,
                        score_earned: outcome.score_earned,
                        correct_answer: outcome.correct_answer,
                        explanation: outcome.explanation,
                        current_score: outcome.current_score,
                    }),
            )
            .await;
        }

        ClientMessage::GetGameState { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .game_state(room_id, member_id)
                    .map(|view| ServerMessage::GameState { state: view }),
            )
            .await;
        }

        ClientMessage::GetQuestionResults { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .question_results(room_id, member_id)
                    .map(|results| ServerMessage::QuestionResults { results }),
            )
            .await;
        }

        ClientMessage::GetGameSummary { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .game_summary(room_id, member_id)
                    .map(|summary| ServerMessage::GameSummary { summary }),
            )
            .await;
        }

        ClientMessage::GetRoomLeaderboard { room_id } => {
            reply(
                member_id,
                state,
                state
                    .service
                    .room_leaderboard(room_id)
                    .map(|entries| ServerMessage::RoomLeaderboard { room_id, entries }),
            )
            .await;
        }

        ClientMessage::SubmitSoloAnswer {
            question_id,
            answer,
            time_taken,
        } => {
            reply(
                member_id,
                state,
                state
                    .solo
                    .submit_answer(member_id, question_id, &answer, time_taken)
                    .map(|outcome| ServerMessage::SoloResult {
                        is_correct: outcome.is_correct,
                        score_earned: outcome.score_earned,
                        correct_answer: outcome.correct_answer,
                        explanation: outcome.explanation,
                        member_score: outcome.member_score,
                        member_level: outcome.member_level,
                    }),
            )
            .await;
        }

        ClientMessage::GetSoloStats => {
            reply(
                member_id,
                state,
                state
                    .solo
                    .stats(member_id)
                    .map(|stats| ServerMessage::SoloStats { stats }),
            )
            .await;
        }

        ClientMessage::GetMemberLeaderboard { limit } => {
            let limit = limit.unwrap_or(10).clamp(1, 100) as usize;
            let entries = state.directory.top_members(limit);
            send_to_member(member_id, ServerMessage::MemberLeaderboard { entries }, state).await;
        }

        ClientMessage::Ping => {
            send_to_member(member_id, ServerMessage::Pong, state).await;
        }

        ClientMessage::Disconnect => {
            handle_disconnect(member_id, state).await;
        }
    }

    Ok(())
}

fn advance_reply(room_id: Uuid, result: AdvanceResult) -> ServerMessage {
    match result {
        AdvanceResult::Advanced {
            current_round,
            total_rounds,
            question,
        } => ServerMessage::QuestionAdvanced {
            room_id,
            current_round,
            total_rounds,
            question,
        },
        AdvanceResult::Finished { ended_at } => ServerMessage::GameFinished { room_id, ended_at },
    }
}

pub async fn handle_disconnect(member_id: Uuid, state: &SharedState) {
    // A dropped connection vacates the member's seat, exactly as an
    // explicit leave would.
    if let Some(room_id) = state.service.active_room_of(member_id) {
        if let Err(e) = state.service.leave_room(room_id, member_id) {
            tracing::warn!(%member_id, "failed to vacate room on disconnect: {}", e);
        }
        state.broadcaster.unsubscribe(room_id, member_id);
    }
    state.broadcaster.unregister(member_id);
    state.connections.write().unwrap().remove(&member_id);
}

async fn require_member(member_id: Uuid, state: &SharedState) -> Option<Member> {
    match state.directory.by_id(member_id) {
        Some(member) => Some(member),
        None => {
            send_error(member_id, &RoomError::MemberNotFound, state).await;
            None
        }
    }
}

async fn reply(member_id: Uuid, state: &SharedState, result: Result<ServerMessage, RoomError>) {
    match result {
        Ok(msg) => send_to_member(member_id, msg, state).await,
        Err(e) => send_error(member_id, &e, state).await,
    }
}

async fn send_error(member_id: Uuid, err: &RoomError, state: &SharedState) {
    tracing::debug!(%member_id, code = ?err.kind(), "request rejected: {}", err);
    send_to_member(
        member_id,
        ServerMessage::Error {
            code: err.kind(),
            message: err.to_string(),
        },
        state,
    )
    .await;
}

async fn send_to_member(member_id: Uuid, msg: ServerMessage, state: &SharedState) {
    let tx = state
        .connections
        .read()
        .unwrap()
        .get(&member_id)
        .map(|conn| conn.tx.clone());
    if let Some(tx) = tx {
        let _ = tx.send(msg).await;
    }
}
