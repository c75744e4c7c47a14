//! Idle-turn timeout enforcement.
//!
//! A session whose side to move has not played for longer than the
//! threshold is finished with reason `timeout`, the idle side losing. The
//! sweep runs on its own interval for the lifetime of the server; request
//! handlers also call [`expire_if_idle`] before touching a session so a
//! stale game is never played on between sweeps.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::models::game_state::GameSession;
use crate::service::settle_finished;
use crate::store::{GameStore, PlayerStore, SessionHandle};

pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Longest a turn may stay idle
    pub turn_timeout: Duration,
    /// Delay between sweeps
    pub sweep_interval: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Finish the session on timeout if it has been idle past `turn_timeout`.
///
/// Holds the session lock for the check and the transition, so a move
/// committed a moment earlier simply makes this a no-op. Returns the
/// finished session when this call timed it out.
pub fn expire_if_idle(
    handle: &SessionHandle,
    players: &dyn PlayerStore,
    turn_timeout: Duration,
    now: DateTime<Utc>,
) -> Option<GameSession> {
    let mut session = handle.lock();
    time_out_if_idle(&mut session, players, turn_timeout, now).then(|| session.clone())
}

/// Same check on a session whose lock the caller already holds. Returns
/// whether this call finished it.
pub fn time_out_if_idle(
    session: &mut GameSession,
    players: &dyn PlayerStore,
    turn_timeout: Duration,
    now: DateTime<Utc>,
) -> bool {
    if !session.is_idle(now, turn_timeout) {
        return false;
    }

    let idle_for = session.idle_for(now);
    if !session.time_out(now) {
        return false;
    }
    info!(
        "Game {}: {} timed out after {:.1}s of inactivity",
        session.id(),
        session.side_to_move(),
        idle_for.as_secs_f64()
    );
    settle_finished(players, session);
    true
}

pub struct TimeoutSupervisor {
    games: Arc<dyn GameStore>,
    players: Arc<dyn PlayerStore>,
    policy: TimeoutPolicy,
}

impl TimeoutSupervisor {
    pub fn new(
        games: Arc<dyn GameStore>,
        players: Arc<dyn PlayerStore>,
        policy: TimeoutPolicy,
    ) -> Self {
        TimeoutSupervisor {
            games,
            players,
            policy,
        }
    }

    /// One pass over every in-progress session. Each session is locked and
    /// released on its own, so games not being expired are held only briefly.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<GameSession> {
        let active = self.games.active_sessions();
        debug!("Checking {} active games for timeouts", active.len());

        active
            .iter()
            .filter_map(|handle| {
                expire_if_idle(handle, self.players.as_ref(), self.policy.turn_timeout, now)
            })
            .collect()
    }

    /// Sweep forever on `sweep_interval`, handing each timed-out session to
    /// `on_timeout`.
    pub async fn run<F>(self, mut on_timeout: F)
    where
        F: FnMut(&GameSession),
    {
        info!(
            "Starting timeout supervisor: {}s turn limit, sweeping every {}s",
            self.policy.turn_timeout.as_secs(),
            self.policy.sweep_interval.as_secs()
        );
        let mut ticker = actix_rt::time::interval(self.policy.sweep_interval);
        loop {
            ticker.tick().await;
            for session in self.sweep(Utc::now()) {
                on_timeout(&session);
            }
        }
    }
}
