use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GameError, GameResult};
use crate::game::board::{Board, Color, Piece, Position};
use crate::game::detector::{is_checkmate, is_in_check, is_stalemate};
use crate::game::rules::is_legal_move;
use crate::models::ids::{PlayerId, SessionId};
use crate::models::player::PlayerResult;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Checkmate,
    Stalemate,
    Forfeit,
    Timeout,
}

/// Append-only audit entry for an accepted move
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub game_id: SessionId,
    pub mover: PlayerId,
    pub from: Position,
    pub to: Position,
    pub piece: Piece,
    pub played_at: DateTime<Utc>,
}

/// A player waiting to be paired
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub player: PlayerId,
    pub enqueued_at: DateTime<Utc>,
}

/// One match between two players.
///
/// `in_progress` until checkmate, stalemate, forfeit or timeout moves it to
/// `finished`; a finished session never changes again. Finishing twice is a
/// no-op so that a move reaching checkmate and the timeout sweep can race
/// on the same session harmlessly.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    white: PlayerId,
    black: PlayerId,
    board: Board,
    side_to_move: Color,
    status: SessionStatus,
    winner: Option<PlayerId>,
    finish_reason: Option<FinishReason>,
    timed_out_player: Option<PlayerId>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl GameSession {
    /// New game from the standard setup, white to move
    pub fn new(id: SessionId, white: PlayerId, black: PlayerId, now: DateTime<Utc>) -> Self {
        Self::from_position(id, white, black, Board::starting(), Color::White, now)
    }

    /// Resume a game from an arbitrary position
    pub fn from_position(
        id: SessionId,
        white: PlayerId,
        black: PlayerId,
        board: Board,
        side_to_move: Color,
        now: DateTime<Utc>,
    ) -> Self {
        GameSession {
            id,
            white,
            black,
            board,
            side_to_move,
            status: SessionStatus::InProgress,
            winner: None,
            finish_reason: None,
            timed_out_player: None,
            created_at: now,
            last_activity: now,
            finished_at: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn white(&self) -> PlayerId {
        self.white
    }

    pub fn black(&self) -> PlayerId {
        self.black
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    /// `None` while in progress and for draws
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn timed_out_player(&self) -> Option<PlayerId> {
        self.timed_out_player
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn color_of(&self, player: PlayerId) -> Option<Color> {
        if player == self.white {
            Some(Color::White)
        } else if player == self.black {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn player_with(&self, color: Color) -> PlayerId {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        self.color_of(player).map(|color| self.player_with(color.opponent()))
    }

    /// Validate and commit a move by `mover`.
    ///
    /// On success the board and turn are committed, the idle clock is reset
    /// and the side now to move is tested for checkmate, then stalemate.
    /// Any error leaves the session untouched.
    pub fn apply_move(
        &mut self,
        mover: PlayerId,
        from: Position,
        to: Position,
        now: DateTime<Utc>,
    ) -> GameResult<MoveRecord> {
        if self.is_finished() {
            return Err(GameError::GameFinished);
        }
        let color = self.color_of(mover).ok_or(GameError::NotParticipant)?;
        if color != self.side_to_move {
            return Err(GameError::NotYourTurn);
        }

        let piece = self
            .board
            .occupant_at(from)
            .ok_or(GameError::NoPieceAtSource { square: from })?;
        if piece.color != color {
            return Err(GameError::NotYourPiece);
        }
        if !is_legal_move(piece, from, to, &self.board) {
            return Err(GameError::IllegalMove { from, to });
        }

        let next = self.board.with_move(from, to);
        if is_in_check(color, &next) {
            return Err(GameError::SelfCheck);
        }

        self.board = next;
        self.side_to_move = color.opponent();
        self.last_activity = now;

        let defender = self.side_to_move;
        if is_checkmate(defender, &self.board) {
            self.force_finish(FinishReason::Checkmate, Some(mover), None, now);
        } else if is_stalemate(defender, &self.board) {
            self.force_finish(FinishReason::Stalemate, None, None, now);
        }

        Ok(MoveRecord {
            game_id: self.id,
            mover,
            from,
            to,
            piece,
            played_at: now,
        })
    }

    /// Move to `finished` with the given outcome.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// session was already finished (in which case nothing changes).
    pub fn force_finish(
        &mut self,
        reason: FinishReason,
        winner: Option<PlayerId>,
        timed_out_player: Option<PlayerId>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.is_finished() {
            return false;
        }
        self.status = SessionStatus::Finished;
        self.winner = winner;
        self.finish_reason = Some(reason);
        self.timed_out_player = timed_out_player;
        self.finished_at = Some(now);
        true
    }

    /// Concede the game to the opponent of `player`
    pub fn forfeit(&mut self, player: PlayerId, now: DateTime<Utc>) -> GameResult<bool> {
        let winner = self.opponent_of(player).ok_or(GameError::NotParticipant)?;
        Ok(self.force_finish(FinishReason::Forfeit, Some(winner), None, now))
    }

    /// Finish on inactivity: the side to move loses
    pub fn time_out(&mut self, now: DateTime<Utc>) -> bool {
        let idle = self.player_with(self.side_to_move);
        let winner = self.player_with(self.side_to_move.opponent());
        self.force_finish(FinishReason::Timeout, Some(winner), Some(idle), now)
    }

    pub fn record_activity(&mut self, at: DateTime<Utc>) {
        self.last_activity = at;
    }

    /// Time since the last accepted move (or creation). Zero if `now` is
    /// earlier than the last activity.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_activity)
            .to_std()
            .unwrap_or_default()
    }

    pub fn is_idle(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        !self.is_finished() && self.idle_for(now) > threshold
    }

    pub fn result_for(&self, player: PlayerId) -> Option<PlayerResult> {
        if !self.is_finished() || self.color_of(player).is_none() {
            return None;
        }
        Some(match self.winner {
            None => PlayerResult::Draw,
            Some(winner) if winner == player => PlayerResult::Win,
            Some(_) => PlayerResult::Loss,
        })
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            game_id: self.id,
            white: self.white,
            black: self.black,
            board: self.board,
            turn: self.side_to_move,
            status: self.status,
            is_finished: self.is_finished(),
            winner: self.winner,
            finish_reason: self.finish_reason,
            timed_out_player: self.timed_out_player,
            in_check: is_in_check(self.side_to_move, &self.board),
            created_at: self.created_at,
            last_activity: self.last_activity,
        }
    }
}

/// Post-operation snapshot of a session returned to callers
#[derive(Serialize, Debug, Clone)]
pub struct SessionView {
    pub game_id: SessionId,
    pub white: PlayerId,
    pub black: PlayerId,
    pub board: Board,
    pub turn: Color,
    pub status: SessionStatus,
    pub is_finished: bool,
    pub winner: Option<PlayerId>,
    pub finish_reason: Option<FinishReason>,
    pub timed_out_player: Option<PlayerId>,
    /// Whether the side to move is in check
    pub in_check: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn sq(name: &str) -> Position {
        name.parse().unwrap()
    }

    fn board(pieces: &[(&str, &str)]) -> Board {
        Board::from_pieces(
            pieces
                .iter()
                .map(|(square, name)| (sq(square), name.parse::<Piece>().unwrap())),
        )
    }

    fn new_game() -> (GameSession, PlayerId, PlayerId) {
        let (white, black) = (PlayerId::new(), PlayerId::new());
        (GameSession::new(SessionId::new(), white, black, Utc::now()), white, black)
    }

    #[test]
    fn new_session_starts_with_white_to_move() {
        let (session, white, black) = new_game();
        assert_eq!(session.side_to_move(), Color::White);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.board(), &Board::starting());
        assert_eq!(session.color_of(white), Some(Color::White));
        assert_eq!(session.color_of(black), Some(Color::Black));
        assert_eq!(session.opponent_of(white), Some(black));
    }

    #[test]
    fn turns_alternate_after_each_accepted_move() {
        let (mut session, white, black) = new_game();
        let moves = [
            (white, "e2", "e4"),
            (black, "e7", "e5"),
            (white, "g1", "f3"),
            (black, "b8", "c6"),
        ];
        for (mover, from, to) in moves {
            let before = session.side_to_move();
            session.apply_move(mover, sq(from), sq(to), Utc::now()).unwrap();
            assert_eq!(session.side_to_move(), before.opponent());
        }
        assert_eq!(
            session.apply_move(black, sq("d7"), sq("d5"), Utc::now()),
            Err(GameError::NotYourTurn)
        );
    }

    #[test]
    fn rejections_leave_the_session_unchanged() {
        let (mut session, white, black) = new_game();
        let stranger = PlayerId::new();
        let now = Utc::now();

        let cases = [
            (stranger, "e2", "e4", GameError::NotParticipant),
            (black, "e7", "e5", GameError::NotYourTurn),
            (white, "e4", "e5", GameError::NoPieceAtSource { square: sq("e4") }),
            (white, "e7", "e5", GameError::NotYourPiece),
            (white, "e2", "e5", GameError::IllegalMove { from: sq("e2"), to: sq("e5") }),
        ];
        for (mover, from, to, expected) in cases {
            let before = *session.board();
            assert_eq!(session.apply_move(mover, sq(from), sq(to), now), Err(expected));
            assert_eq!(session.board(), &before);
            assert_eq!(session.side_to_move(), Color::White);
        }
    }

    #[test]
    fn moving_a_pinned_piece_off_the_line_is_self_check() {
        let (white, black) = (PlayerId::new(), PlayerId::new());
        let position = board(&[
            ("e1", "white_king"),
            ("e2", "white_rook"),
            ("e8", "black_rook"),
            ("a8", "black_king"),
        ]);
        let mut session = GameSession::from_position(
            SessionId::new(),
            white,
            black,
            position,
            Color::White,
            Utc::now(),
        );

        assert_eq!(
            session.apply_move(white, sq("e2"), sq("d2"), Utc::now()),
            Err(GameError::SelfCheck)
        );
        assert_eq!(session.board(), &position);
        assert!(session.apply_move(white, sq("e2"), sq("e5"), Utc::now()).is_ok());
    }

    #[test]
    fn checkmating_move_finishes_with_mover_as_winner() {
        let (white, black) = (PlayerId::new(), PlayerId::new());
        let position = board(&[
            ("g1", "white_king"),
            ("d1", "white_rook"),
            ("g8", "black_king"),
            ("f7", "black_pawn"),
            ("g7", "black_pawn"),
            ("h7", "black_pawn"),
        ]);
        let mut session = GameSession::from_position(
            SessionId::new(),
            white,
            black,
            position,
            Color::White,
            Utc::now(),
        );

        session.apply_move(white, sq("d1"), sq("d8"), Utc::now()).unwrap();
        assert!(session.is_finished());
        assert_eq!(session.finish_reason(), Some(FinishReason::Checkmate));
        assert_eq!(session.winner(), Some(white));
        assert_eq!(session.result_for(black), Some(PlayerResult::Loss));
        assert!(session.view().in_check);
        assert_eq!(
            session.apply_move(black, sq("h7"), sq("h6"), Utc::now()),
            Err(GameError::GameFinished)
        );
    }

    #[test]
    fn stalemating_move_finishes_as_draw() {
        let (white, black) = (PlayerId::new(), PlayerId::new());
        let position = board(&[("h1", "white_king"), ("c5", "white_queen"), ("a8", "black_king")]);
        let mut session = GameSession::from_position(
            SessionId::new(),
            white,
            black,
            position,
            Color::White,
            Utc::now(),
        );

        session.apply_move(white, sq("c5"), sq("b6"), Utc::now()).unwrap();
        assert!(session.is_finished());
        assert_eq!(session.finish_reason(), Some(FinishReason::Stalemate));
        assert_eq!(session.winner(), None);
        assert_eq!(session.result_for(white), Some(PlayerResult::Draw));
        assert_eq!(session.result_for(black), Some(PlayerResult::Draw));
    }

    #[test]
    fn force_finish_is_idempotent() {
        let (mut session, white, black) = new_game();
        let now = Utc::now();

        assert!(session.forfeit(white, now).unwrap());
        let once = session.view();
        assert!(!session.force_finish(FinishReason::Timeout, Some(white), Some(black), now));
        assert!(!session.time_out(now));
        let twice = session.view();

        assert_eq!(once.winner, Some(black));
        assert_eq!(twice.winner, once.winner);
        assert_eq!(twice.finish_reason, Some(FinishReason::Forfeit));
        assert_eq!(twice.timed_out_player, None);
    }

    #[test]
    fn outsiders_cannot_forfeit() {
        let (mut session, _, _) = new_game();
        assert_eq!(session.forfeit(PlayerId::new(), Utc::now()), Err(GameError::NotParticipant));
        assert!(!session.is_finished());
    }

    #[test]
    fn timeout_awards_the_side_not_to_move() {
        let (mut session, white, black) = new_game();
        session.apply_move(white, sq("d2"), sq("d4"), Utc::now()).unwrap();

        assert!(session.time_out(Utc::now()));
        assert_eq!(session.winner(), Some(white));
        assert_eq!(session.timed_out_player(), Some(black));
        assert_eq!(session.finish_reason(), Some(FinishReason::Timeout));
    }

    #[test]
    fn idle_threshold_is_strict() {
        let (mut session, _, _) = new_game();
        let now = Utc::now();
        let threshold = Duration::from_secs(60);

        session.record_activity(now - TimeDelta::seconds(60));
        assert!(!session.is_idle(now, threshold));
        session.record_activity(now - TimeDelta::seconds(61));
        assert!(session.is_idle(now, threshold));
        session.record_activity(now + TimeDelta::seconds(5));
        assert_eq!(session.idle_for(now), Duration::ZERO);
    }
}
