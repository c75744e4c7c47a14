//! Persistence collaborators.
//!
//! The rule engine only talks to these traits. Sessions are handed out as
//! [`SessionHandle`]s: every transition on a session happens while its mutex
//! is held, which is what keeps a move and a timeout from interleaving on
//! the same game.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::GameResult;
use crate::models::game_state::{GameSession, MoveRecord, QueueEntry};
use crate::models::ids::{PlayerId, SessionId};
use crate::models::player::Player;

pub mod memory;

pub use memory::{MemoryGameStore, MemoryPlayerStore};

/// Locked access to one stored session
pub type SessionHandle = Arc<Mutex<GameSession>>;

pub trait PlayerStore: Send + Sync {
    fn register(&self, name: &str, now: DateTime<Utc>) -> Player;

    fn player(&self, id: PlayerId) -> GameResult<Player>;

    /// Count one finished game for both participants in a single update.
    /// `winner == None` records a draw for both.
    fn record_outcome(
        &self,
        white: PlayerId,
        black: PlayerId,
        winner: Option<PlayerId>,
    ) -> GameResult<()>;
}

pub trait GameStore: Send + Sync {
    fn create_session(&self, session: GameSession) -> SessionHandle;

    fn session(&self, id: SessionId) -> GameResult<SessionHandle>;

    /// Every session still in progress
    fn active_sessions(&self) -> Vec<SessionHandle>;

    fn active_session_for(&self, player: PlayerId) -> Option<SessionHandle>;

    /// Finished sessions involving `player`, most recently finished first
    fn finished_sessions_for(&self, player: PlayerId, limit: usize) -> Vec<GameSession>;

    fn queue_entry(&self, player: PlayerId) -> Option<QueueEntry>;

    fn enqueue(&self, entry: QueueEntry);

    fn dequeue(&self, player: PlayerId) -> Option<QueueEntry>;

    /// Longest-waiting entry whose player is not `excluding`
    fn earliest_queue_entry(&self, excluding: PlayerId) -> Option<QueueEntry>;

    fn append_move(&self, record: MoveRecord);

    fn moves(&self, session: SessionId) -> Vec<MoveRecord>;
}
