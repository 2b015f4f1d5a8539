use serde::{Deserialize, Serialize};

/// Stable error code surfaced to clients alongside the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Capacity,
    InvalidState,
    Authorization,
    NoQuestions,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    // Validation
    #[error("room name must not be empty")]
    EmptyRoomName,
    #[error("max players must be between 2 and 6")]
    MaxPlayersOutOfRange,
    #[error("total rounds must be between 5 and 20")]
    TotalRoundsOutOfRange,
    #[error("time per question must be between 10 and 120 seconds")]
    TimePerQuestionOutOfRange,
    #[error("room code must be 6 alphanumeric characters")]
    MalformedCode,
    #[error("answer must not be empty")]
    EmptyAnswer,

    // Not found
    #[error("room not found")]
    RoomNotFound,
    #[error("member not found")]
    MemberNotFound,
    #[error("question not found")]
    QuestionNotFound,
    #[error("you are not in this room")]
    NotInRoom,
    #[error("you have already left this room")]
    AlreadyLeft,
    #[error("no question is currently active")]
    NoCurrentQuestion,

    // Conflict
    #[error("you already have an active room")]
    OwnerHasActiveRoom,
    #[error("you are already in this room")]
    AlreadyInRoom,
    #[error("you are already in another active room")]
    InAnotherRoom,
    #[error("you have already answered this question")]
    AlreadyAnswered,

    // Capacity
    #[error("room is full")]
    RoomFull,

    // Invalid state
    #[error("room is not accepting players")]
    RoomNotWaiting,
    #[error("game is not currently active")]
    GameNotActive,
    #[error("game is not currently paused")]
    GameNotPaused,
    #[error("game has already ended")]
    GameAlreadyFinished,
    #[error("need at least 2 players to start")]
    NotEnoughPlayers,
    #[error("all players must be ready to start")]
    PlayersNotReady,

    // Authorization
    #[error("only the room owner can do that")]
    NotOwner,

    // Question pool
    #[error("no questions available for this category")]
    NoQuestionsAvailable,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        use RoomError::*;
        match self {
            EmptyRoomName | MaxPlayersOutOfRange | TotalRoundsOutOfRange
            | TimePerQuestionOutOfRange | MalformedCode | EmptyAnswer => ErrorKind::Validation,
            RoomNotFound | MemberNotFound | QuestionNotFound | NotInRoom | AlreadyLeft
            | NoCurrentQuestion => ErrorKind::NotFound,
            OwnerHasActiveRoom | AlreadyInRoom | InAnotherRoom | AlreadyAnswered => {
                ErrorKind::Conflict
            }
            RoomFull => ErrorKind::Capacity,
            RoomNotWaiting | GameNotActive | GameNotPaused | GameAlreadyFinished
            | NotEnoughPlayers | PlayersNotReady => ErrorKind::InvalidState,
            NotOwner => ErrorKind::Authorization,
            NoQuestionsAvailable => ErrorKind::NoQuestions,
        }
    }
}
