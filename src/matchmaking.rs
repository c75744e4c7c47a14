//! First-come first-served pairing of waiting players.

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::models::game_state::{GameSession, QueueEntry};
use crate::models::ids::{PlayerId, SessionId};
use crate::store::GameStore;

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    /// No opponent yet; the player now holds this queue entry
    Waiting(QueueEntry),
    /// Paired with the longest-waiting player, who plays white
    Matched(GameSession),
}

pub struct Matchmaker {
    store: Arc<dyn GameStore>,
    // Serialises join/leave so the active-game check, queue lookup and
    // pairing happen as one step.
    pairing: Mutex<()>,
}

impl Matchmaker {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Matchmaker {
            store,
            pairing: Mutex::new(()),
        }
    }

    pub fn join_queue(&self, player: PlayerId, now: DateTime<Utc>) -> GameResult<JoinOutcome> {
        let _pairing = self.pairing.lock();

        if let Some(active) = self.store.active_session_for(player) {
            let session_id = active.lock().id();
            return Err(GameError::AlreadyInGame { session_id });
        }
        if self.store.queue_entry(player).is_some() {
            return Err(GameError::AlreadyQueued);
        }

        match self.store.earliest_queue_entry(player) {
            Some(waiting) => {
                self.store.dequeue(waiting.player);
                let session = GameSession::new(SessionId::new(), waiting.player, player, now);
                info!(
                    "Matched {} (white) with {} (black) in game {}",
                    waiting.player,
                    player,
                    session.id()
                );
                self.store.create_session(session.clone());
                Ok(JoinOutcome::Matched(session))
            }
            None => {
                let entry = QueueEntry {
                    player,
                    enqueued_at: now,
                };
                self.store.enqueue(entry);
                info!("Player {} is waiting for an opponent", player);
                Ok(JoinOutcome::Waiting(entry))
            }
        }
    }

    /// Remove the player's queue entry. Returns whether one existed.
    pub fn leave_queue(&self, player: PlayerId) -> bool {
        let _pairing = self.pairing.lock();
        let removed = self.store.dequeue(player).is_some();
        if removed {
            info!("Player {} left the queue", player);
        }
        removed
    }
}
