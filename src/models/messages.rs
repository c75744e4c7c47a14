use actix::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::board::{Color, Position};
use crate::models::game_state::{FinishReason, MoveRecord, SessionView};
use crate::models::ids::{PlayerId, SessionId};
use crate::models::player::PlayerResult;

/// Message sent from client to server over the websocket
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ClientMessage {
    pub message_type: String,
    pub game_id: Option<String>,
    pub move_from: Option<String>,
    pub move_to: Option<String>,
}

/// Message sent from server to client over the websocket
#[derive(Serialize, Debug, Clone)]
pub struct ServerMessage {
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<MoveRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_moves: Option<Vec<Position>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerMessage {
    pub fn new(message_type: &str) -> Self {
        ServerMessage {
            message_type: message_type.to_string(),
            game_id: None,
            session: None,
            queue: None,
            last_move: None,
            available_moves: None,
            error: None,
        }
    }

    pub fn session(message_type: &str, session: SessionView) -> Self {
        ServerMessage {
            game_id: Some(session.game_id),
            session: Some(session),
            ..Self::new(message_type)
        }
    }

    pub fn queue(status: QueueStatus) -> Self {
        let game_id = match &status {
            QueueStatus::GameStarted { game_id, .. } => Some(*game_id),
            _ => None,
        };
        ServerMessage {
            game_id,
            queue: Some(status),
            ..Self::new("queue_status")
        }
    }

    pub fn move_made(response: MoveResponse) -> Self {
        ServerMessage {
            last_move: Some(response.last_move),
            ..Self::session("move_made", response.session)
        }
    }

    pub fn available_moves(game_id: SessionId, moves: Vec<Position>) -> Self {
        ServerMessage {
            game_id: Some(game_id),
            available_moves: Some(moves),
            ..Self::new("available_moves")
        }
    }

    pub fn error(error: &GameError) -> Self {
        let game_id = match error {
            GameError::AlreadyInGame { session_id } => Some(*session_id),
            _ => None,
        };
        ServerMessage {
            game_id,
            error: Some(error.to_string()),
            ..Self::new("error")
        }
    }
}

/// Serialized frame delivered to a websocket actor
#[derive(Message)]
#[rtype(result = "()")]
pub struct ChessWebSocketMessage(pub String);

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
}

/// Where a player stands with respect to matchmaking
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueueStatus {
    GameStarted {
        game_id: SessionId,
        your_color: Color,
        opponent: PlayerId,
    },
    Waiting {
        since: DateTime<Utc>,
    },
    NotFound,
}

/// Response to an accepted move
#[derive(Serialize, Debug, Clone)]
pub struct MoveResponse {
    #[serde(flatten)]
    pub session: SessionView,
    pub last_move: MoveRecord,
    /// Whether the side that just moved is in check after its own move
    pub mover_in_check: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InactivityReport {
    pub game_id: SessionId,
    pub current_turn: Color,
    pub last_activity: DateTime<Utc>,
    pub inactivity_seconds: f64,
    pub will_timeout: bool,
    pub timeout_threshold_seconds: u64,
    pub remaining_seconds: f64,
}

/// A finished game from one player's perspective
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub game_id: SessionId,
    pub finished_at: Option<DateTime<Utc>>,
    pub opponent: PlayerId,
    pub player_color: Color,
    pub result: PlayerResult,
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutAttribution>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAttribution {
    YouTimedOut,
    OpponentTimedOut,
}
