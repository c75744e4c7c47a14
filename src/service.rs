//! Caller-facing operations.
//!
//! Transports (HTTP routes, websocket handlers) go through [`GameService`];
//! it resolves sessions from the store, applies transitions under the
//! session lock and settles player statistics when a game finishes.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::game::board::{Color, Position};
use crate::game::detector::{is_in_check, safe_destinations};
use crate::matchmaking::{JoinOutcome, Matchmaker};
use crate::models::game_state::{GameSession, MoveRecord, SessionView};
use crate::models::ids::{PlayerId, SessionId};
use crate::models::messages::{
    GameSummary, InactivityReport, MoveResponse, QueueStatus, TimeoutAttribution,
};
use crate::models::player::Player;
use crate::store::{GameStore, PlayerStore, SessionHandle};
use crate::supervisor::{time_out_if_idle, TimeoutPolicy, TimeoutSupervisor};

const RECENT_GAMES_LIMIT: usize = 10;

/// Update both participants' statistics for a session that has just been
/// finished. Call once, under the session lock, right after the transition.
pub(crate) fn settle_finished(players: &dyn PlayerStore, session: &GameSession) {
    if let Err(e) = players.record_outcome(session.white(), session.black(), session.winner()) {
        warn!("Could not record result of game {}: {}", session.id(), e);
    }
}

/// Snapshot after a request, and whether that request finished the game
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub view: SessionView,
    pub finished_now: bool,
}

pub struct GameService {
    players: Arc<dyn PlayerStore>,
    games: Arc<dyn GameStore>,
    matchmaker: Matchmaker,
    policy: TimeoutPolicy,
}

impl GameService {
    pub fn new(
        players: Arc<dyn PlayerStore>,
        games: Arc<dyn GameStore>,
        policy: TimeoutPolicy,
    ) -> Self {
        GameService {
            matchmaker: Matchmaker::new(games.clone()),
            players,
            games,
            policy,
        }
    }

    /// Supervisor sharing this service's stores and policy
    pub fn timeout_supervisor(&self) -> TimeoutSupervisor {
        TimeoutSupervisor::new(self.games.clone(), self.players.clone(), self.policy)
    }

    pub fn register_player(&self, name: &str) -> GameResult<Player> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::MissingField("name"));
        }
        let player = self.players.register(name, Utc::now());
        info!("Registered player {} ({})", player.name, player.id);
        Ok(player)
    }

    pub fn player(&self, id: PlayerId) -> GameResult<Player> {
        self.players.player(id)
    }

    pub fn join_queue(&self, player: PlayerId) -> GameResult<QueueStatus> {
        self.players.player(player)?;
        match self.matchmaker.join_queue(player, Utc::now()) {
            Ok(JoinOutcome::Waiting(entry)) => Ok(QueueStatus::Waiting {
                since: entry.enqueued_at,
            }),
            Ok(JoinOutcome::Matched(session)) => Ok(game_started(&session, player)),
            Err(GameError::AlreadyQueued) => self.queue_status(player),
            Err(e) => Err(e),
        }
    }

    pub fn leave_queue(&self, player: PlayerId) -> GameResult<()> {
        self.matchmaker.leave_queue(player);
        Ok(())
    }

    /// Poll for a pairing; clears a leftover queue entry once a game exists
    pub fn queue_status(&self, player: PlayerId) -> GameResult<QueueStatus> {
        if let Some(handle) = self.games.active_session_for(player) {
            if self.games.dequeue(player).is_some() {
                debug!("Removed stale queue entry for {}", player);
            }
            let session = handle.lock();
            return Ok(game_started(&session, player));
        }

        Ok(match self.games.queue_entry(player) {
            Some(entry) => QueueStatus::Waiting {
                since: entry.enqueued_at,
            },
            None => QueueStatus::NotFound,
        })
    }

    /// Current snapshot; an idle game is timed out first.
    pub fn session_status(
        &self,
        player: PlayerId,
        game_id: SessionId,
    ) -> GameResult<SessionUpdate> {
        let handle = self.participant_session(player, game_id)?;
        let mut session = handle.lock();
        let finished_now = self.time_out_if_idle(&mut session);
        Ok(SessionUpdate {
            view: session.view(),
            finished_now,
        })
    }

    /// Validate and commit a move. `TimedOut` is returned only by the call
    /// that found the turn idle and finished the game; later calls get
    /// `GameFinished`.
    pub fn submit_move(
        &self,
        player: PlayerId,
        game_id: SessionId,
        from: &str,
        to: &str,
    ) -> GameResult<MoveResponse> {
        let from: Position = from.parse()?;
        let to: Position = to.parse()?;
        let handle = self.participant_session(player, game_id)?;

        let mut session = handle.lock();
        if self.time_out_if_idle(&mut session) {
            return Err(GameError::TimedOut);
        }
        let record = match session.apply_move(player, from, to, Utc::now()) {
            Ok(record) => record,
            Err(e) => {
                debug!("Game {}: rejected {}-{} by {}: {}", game_id, from, to, player, e);
                return Err(e);
            }
        };
        info!("Game {}: {} played {} {}-{}", game_id, player, record.piece, from, to);
        self.games.append_move(record.clone());

        if session.is_finished() {
            info!(
                "Game {} finished by {:?}, winner {:?}",
                game_id,
                session.finish_reason(),
                session.winner()
            );
            settle_finished(self.players.as_ref(), &session);
        }

        Ok(MoveResponse {
            mover_in_check: is_in_check(record.piece.color, session.board()),
            session: session.view(),
            last_move: record,
        })
    }

    /// Concede. Forfeiting an already finished game changes nothing.
    pub fn forfeit(&self, player: PlayerId, game_id: SessionId) -> GameResult<SessionUpdate> {
        let handle = self.games.session(game_id)?;
        let mut session = handle.lock();
        let finished_now = session.forfeit(player, Utc::now())?;
        if finished_now {
            info!("Game {}: {} forfeited", game_id, player);
            settle_finished(self.players.as_ref(), &session);
        }
        Ok(SessionUpdate {
            view: session.view(),
            finished_now,
        })
    }

    pub fn move_history(
        &self,
        player: PlayerId,
        game_id: SessionId,
    ) -> GameResult<Vec<MoveRecord>> {
        self.participant_session(player, game_id)?;
        Ok(self.games.moves(game_id))
    }

    pub fn inactivity(
        &self,
        player: PlayerId,
        game_id: SessionId,
    ) -> GameResult<InactivityReport> {
        let handle = self.participant_session(player, game_id)?;
        let session = handle.lock();
        let idle = session.idle_for(Utc::now());
        let threshold = self.policy.turn_timeout;

        Ok(InactivityReport {
            game_id,
            current_turn: session.side_to_move(),
            last_activity: session.last_activity(),
            inactivity_seconds: idle.as_secs_f64(),
            will_timeout: idle > threshold,
            timeout_threshold_seconds: threshold.as_secs(),
            remaining_seconds: threshold.saturating_sub(idle).as_secs_f64(),
        })
    }

    pub fn recent_games(&self, player: PlayerId) -> GameResult<Vec<GameSummary>> {
        self.players.player(player)?;
        let summaries = self
            .games
            .finished_sessions_for(player, RECENT_GAMES_LIMIT)
            .iter()
            .filter_map(|session| summarize(session, player))
            .collect();
        Ok(summaries)
    }

    /// Squares the piece on `from` may safely move to. Only the side to move
    /// gets destinations; its opponent's pieces are rejected.
    pub fn available_moves(
        &self,
        player: PlayerId,
        game_id: SessionId,
        from: &str,
    ) -> GameResult<Vec<Position>> {
        let from: Position = from.parse()?;
        let handle = self.participant_session(player, game_id)?;
        let session = handle.lock();
        if session.is_finished() {
            return Err(GameError::GameFinished);
        }

        let piece = session
            .board()
            .occupant_at(from)
            .ok_or(GameError::NoPieceAtSource { square: from })?;
        if Some(piece.color) != session.color_of(player) {
            return Err(GameError::NotYourPiece);
        }
        if piece.color != session.side_to_move() {
            return Ok(Vec::new());
        }
        Ok(safe_destinations(session.board(), from))
    }

    fn participant_session(
        &self,
        player: PlayerId,
        game_id: SessionId,
    ) -> GameResult<SessionHandle> {
        let handle = self.games.session(game_id)?;
        if handle.lock().color_of(player).is_none() {
            return Err(GameError::NotParticipant);
        }
        Ok(handle)
    }

    fn time_out_if_idle(&self, session: &mut GameSession) -> bool {
        time_out_if_idle(session, self.players.as_ref(), self.policy.turn_timeout, Utc::now())
    }
}

fn game_started(session: &GameSession, player: PlayerId) -> QueueStatus {
    let your_color = session.color_of(player).unwrap_or(Color::White);
    QueueStatus::GameStarted {
        game_id: session.id(),
        your_color,
        opponent: session.player_with(your_color.opponent()),
    }
}

fn summarize(session: &GameSession, player: PlayerId) -> Option<GameSummary> {
    let player_color = session.color_of(player)?;
    let timeout = session.timed_out_player().map(|idle| {
        if idle == player {
            TimeoutAttribution::YouTimedOut
        } else {
            TimeoutAttribution::OpponentTimedOut
        }
    });

    Some(GameSummary {
        game_id: session.id(),
        finished_at: session.finished_at(),
        opponent: session.player_with(player_color.opponent()),
        player_color,
        result: session.result_for(player)?,
        finish_reason: session.finish_reason(),
        timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::game_state::FinishReason;
    use crate::store::{MemoryGameStore, MemoryPlayerStore};
    use chrono::TimeDelta;

    fn service() -> GameService {
        service_with_games().0
    }

    fn service_with_games() -> (GameService, Arc<MemoryGameStore>) {
        let games = Arc::new(MemoryGameStore::new());
        let service = GameService::new(
            Arc::new(MemoryPlayerStore::new()),
            games.clone(),
            TimeoutPolicy::default(),
        );
        (service, games)
    }

    fn paired(service: &GameService) -> (SessionId, PlayerId, PlayerId) {
        let white = service.register_player("white").unwrap().id;
        let black = service.register_player("black").unwrap().id;
        service.join_queue(white).unwrap();
        let QueueStatus::GameStarted { game_id, .. } = service.join_queue(black).unwrap() else {
            panic!("expected a game");
        };
        (game_id, white, black)
    }

    fn make_idle(games: &MemoryGameStore, game_id: SessionId) {
        games
            .session(game_id)
            .unwrap()
            .lock()
            .record_activity(Utc::now() - TimeDelta::seconds(61));
    }

    #[test]
    fn status_reports_the_timeout_it_triggered() {
        let (service, games) = service_with_games();
        let (game_id, _, black) = paired(&service);
        make_idle(&games, game_id);

        let first = service.session_status(black, game_id).unwrap();
        assert!(first.finished_now);
        assert_eq!(first.view.finish_reason, Some(FinishReason::Timeout));

        let second = service.session_status(black, game_id).unwrap();
        assert!(!second.finished_now);
        assert!(service.timeout_supervisor().sweep(Utc::now()).is_empty());
    }

    #[test]
    fn only_the_first_move_on_an_idle_game_reports_the_timeout() {
        let (service, games) = service_with_games();
        let (game_id, white, _) = paired(&service);
        make_idle(&games, game_id);

        assert_eq!(
            service.submit_move(white, game_id, "e2", "e4").unwrap_err(),
            GameError::TimedOut
        );
        assert_eq!(
            service.submit_move(white, game_id, "e2", "e4").unwrap_err(),
            GameError::GameFinished
        );
        assert!(games.moves(game_id).is_empty());
    }

    #[test]
    fn repeated_forfeit_is_not_a_new_finish() {
        let service = service();
        let (game_id, white, black) = paired(&service);

        let first = service.forfeit(white, game_id).unwrap();
        assert!(first.finished_now);
        assert_eq!(first.view.winner, Some(black));

        let again = service.forfeit(black, game_id).unwrap();
        assert!(!again.finished_now);
        assert_eq!(again.view.winner, Some(black));
    }

    #[test]
    fn unknown_players_cannot_queue() {
        let service = service();
        let ghost = PlayerId::new();
        assert_eq!(service.join_queue(ghost), Err(GameError::PlayerNotFound(ghost)));
    }

    #[test]
    fn rejoining_reports_the_existing_wait() {
        let service = service();
        let alice = service.register_player("alice").unwrap().id;

        let first = service.join_queue(alice).unwrap();
        let second = service.join_queue(alice).unwrap();
        assert!(matches!(first, QueueStatus::Waiting { .. }));
        assert_eq!(first, second);
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(service().register_player("  "), Err(GameError::MissingField("name")));
    }

    #[test]
    fn available_moves_for_opening_knight() {
        let service = service();
        let alice = service.register_player("alice").unwrap().id;
        let bob = service.register_player("bob").unwrap().id;
        service.join_queue(alice).unwrap();
        let QueueStatus::GameStarted { game_id, .. } = service.join_queue(bob).unwrap() else {
            panic!("expected a game");
        };

        let mut moves: Vec<String> = service
            .available_moves(alice, game_id, "g1")
            .unwrap()
            .iter()
            .map(|square| square.to_string())
            .collect();
        moves.sort();
        assert_eq!(moves, vec!["f3", "h3"]);
        assert_eq!(service.available_moves(alice, game_id, "g8"), Err(GameError::NotYourPiece));
        assert_eq!(service.available_moves(bob, game_id, "g8").unwrap(), Vec::new());
    }
}
