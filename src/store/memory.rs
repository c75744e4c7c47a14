use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::models::game_state::{GameSession, MoveRecord, QueueEntry};
use crate::models::ids::{PlayerId, SessionId};
use crate::models::player::{Player, PlayerResult, PlayerStats};
use crate::store::{GameStore, PlayerStore, SessionHandle};

/// Players kept in process memory
#[derive(Default)]
pub struct MemoryPlayerStore {
    players: RwLock<HashMap<PlayerId, Player>>,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn register(&self, name: &str, now: DateTime<Utc>) -> Player {
        let player = Player {
            id: PlayerId::new(),
            name: name.to_string(),
            stats: PlayerStats::default(),
            created_at: now,
        };
        self.players.write().insert(player.id, player.clone());
        player
    }

    fn player(&self, id: PlayerId) -> GameResult<Player> {
        self.players
            .read()
            .get(&id)
            .cloned()
            .ok_or(GameError::PlayerNotFound(id))
    }

    fn record_outcome(
        &self,
        white: PlayerId,
        black: PlayerId,
        winner: Option<PlayerId>,
    ) -> GameResult<()> {
        let mut players = self.players.write();
        for id in [white, black] {
            if !players.contains_key(&id) {
                return Err(GameError::PlayerNotFound(id));
            }
        }

        for id in [white, black] {
            let result = match winner {
                None => PlayerResult::Draw,
                Some(winner) if winner == id => PlayerResult::Win,
                Some(_) => PlayerResult::Loss,
            };
            if let Some(player) = players.get_mut(&id) {
                player.stats.record(result);
            }
        }
        Ok(())
    }
}

/// Sessions, queue and move log kept in process memory
#[derive(Default)]
pub struct MemoryGameStore {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    queue: Mutex<HashMap<PlayerId, QueueEntry>>,
    moves: Mutex<HashMap<SessionId, Vec<MoveRecord>>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Snapshot the handles first so no session lock is taken under the map lock.
    fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.read().values().cloned().collect()
    }
}

impl GameStore for MemoryGameStore {
    fn create_session(&self, session: GameSession) -> SessionHandle {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().insert(id, handle.clone());
        handle
    }

    fn session(&self, id: SessionId) -> GameResult<SessionHandle> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(GameError::SessionNotFound(id))
    }

    fn active_sessions(&self) -> Vec<SessionHandle> {
        self.handles()
            .into_iter()
            .filter(|handle| !handle.lock().is_finished())
            .collect()
    }

    fn active_session_for(&self, player: PlayerId) -> Option<SessionHandle> {
        self.handles().into_iter().find(|handle| {
            let session = handle.lock();
            !session.is_finished() && session.color_of(player).is_some()
        })
    }

    fn finished_sessions_for(&self, player: PlayerId, limit: usize) -> Vec<GameSession> {
        let mut finished: Vec<GameSession> = self
            .handles()
            .into_iter()
            .filter_map(|handle| {
                let session = handle.lock();
                let involved = session.color_of(player).is_some();
                (session.is_finished() && involved).then(|| session.clone())
            })
            .collect();
        finished.sort_by(|a, b| b.finished_at().cmp(&a.finished_at()));
        finished.truncate(limit);
        finished
    }

    fn queue_entry(&self, player: PlayerId) -> Option<QueueEntry> {
        self.queue.lock().get(&player).copied()
    }

    fn enqueue(&self, entry: QueueEntry) {
        self.queue.lock().insert(entry.player, entry);
    }

    fn dequeue(&self, player: PlayerId) -> Option<QueueEntry> {
        self.queue.lock().remove(&player)
    }

    fn earliest_queue_entry(&self, excluding: PlayerId) -> Option<QueueEntry> {
        self.queue
            .lock()
            .values()
            .filter(|entry| entry.player != excluding)
            .min_by_key(|entry| entry.enqueued_at)
            .copied()
    }

    fn append_move(&self, record: MoveRecord) {
        self.moves.lock().entry(record.game_id).or_default().push(record);
    }

    fn moves(&self, session: SessionId) -> Vec<MoveRecord> {
        self.moves.lock().get(&session).cloned().unwrap_or_default()
    }
}
