//! Error types for the match server
//!
//! Every rejection is local: a request that fails with a [`GameError`] leaves
//! the session exactly as it was.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::game::board::Position;
use crate::models::ids::{PlayerId, SessionId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid square: {0}")]
    InvalidPosition(String),

    #[error("Invalid piece: {0}")]
    InvalidPiece(String),

    #[error("Invalid player id: {0}")]
    InvalidPlayerId(String),

    #[error("Invalid game id: {0}")]
    InvalidSessionId(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("You are not a participant in this game")]
    NotParticipant,

    #[error("It's not your turn")]
    NotYourTurn,

    #[error("That's not your piece")]
    NotYourPiece,

    #[error("No piece at {square}")]
    NoPieceAtSource { square: Position },

    #[error("Invalid move from {from} to {to}")]
    IllegalMove { from: Position, to: Position },

    #[error("This move would leave your king in check")]
    SelfCheck,

    #[error("Game is already finished")]
    GameFinished,

    #[error("Game has timed out")]
    TimedOut,

    #[error("Game not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Player is already in game {session_id}")]
    AlreadyInGame { session_id: SessionId },

    #[error("Player is already waiting in the queue")]
    AlreadyQueued,
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;

impl ResponseError for GameError {
    fn status_code(&self) -> StatusCode {
        match self {
            GameError::InvalidPosition(_)
            | GameError::InvalidPiece(_)
            | GameError::InvalidPlayerId(_)
            | GameError::InvalidSessionId(_)
            | GameError::MissingField(_)
            | GameError::NoPieceAtSource { .. }
            | GameError::IllegalMove { .. }
            | GameError::SelfCheck
            | GameError::GameFinished
            | GameError::TimedOut => StatusCode::BAD_REQUEST,
            GameError::NotParticipant | GameError::NotYourTurn | GameError::NotYourPiece => {
                StatusCode::FORBIDDEN
            }
            GameError::SessionNotFound(_) | GameError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            GameError::AlreadyInGame { .. } | GameError::AlreadyQueued => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({ "error": self.to_string() });
        if let GameError::AlreadyInGame { session_id } = self {
            body["game_id"] = json!(session_id);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
