use actix::Addr;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::GameError;
use crate::models::game_state::SessionView;
use crate::models::ids::{PlayerId, SessionId};
use crate::models::messages::{ChessWebSocketMessage, MoveResponse, ServerMessage};
use crate::service::{GameService, SessionUpdate};
use crate::websocket::ChessWebSocket;

struct Connection {
    player: PlayerId,
    addr: Addr<ChessWebSocket>,
}

/// Application state shared between HTTP handlers and websocket actors
pub struct AppState {
    pub service: GameService,
    connections: Mutex<HashMap<String, Connection>>,
}

impl AppState {
    pub fn new(service: GameService) -> Self {
        AppState {
            service,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_connection(&self, id: &str, player: PlayerId, addr: Addr<ChessWebSocket>) {
        let mut connections = self.connections.lock();
        connections.insert(id.to_string(), Connection { player, addr });
        info!("Total active connections: {}", connections.len());
    }

    pub fn remove_connection(&self, id: &str) {
        let mut connections = self.connections.lock();
        connections.remove(id);
        info!("Total active connections: {}", connections.len());
    }

    /// Push `message` to every open connection of the given players
    pub fn notify(&self, players: &[PlayerId], message: &ServerMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Error serializing {} message: {}", message.message_type, e);
                return;
            }
        };

        // Collect the recipients first so no send happens under the lock
        let recipients: Vec<Addr<ChessWebSocket>> = {
            let connections = self.connections.lock();
            connections
                .values()
                .filter(|conn| players.contains(&conn.player))
                .map(|conn| conn.addr.clone())
                .collect()
        };

        debug!("Pushing {} to {} connections", message.message_type, recipients.len());
        for addr in recipients {
            addr.do_send(ChessWebSocketMessage(frame.clone()));
        }
    }

    /// Push a session snapshot to both of its participants
    pub fn announce(&self, message_type: &str, session: SessionView) {
        let players = [session.white, session.black];
        self.notify(&players, &ServerMessage::session(message_type, session));
    }

    /// Push `game_over` when the request behind `update` finished the game
    pub fn announce_if_finished(&self, update: &SessionUpdate) {
        if update.finished_now {
            self.announce("game_over", update.view.clone());
        }
    }

    /// Pass a rejected move's error through. A `TimedOut` rejection is the
    /// request that ended the game, so both players hear about it.
    pub fn move_rejected(
        &self,
        player: PlayerId,
        game_id: SessionId,
        error: GameError,
    ) -> GameError {
        if error == GameError::TimedOut {
            match self.service.session_status(player, game_id) {
                Ok(status) => self.announce("game_over", status.view),
                Err(e) => warn!("Could not load timed out game {}: {}", game_id, e),
            }
        }
        error
    }

    pub fn announce_move(&self, response: MoveResponse) {
        let players = [response.session.white, response.session.black];
        let finished = response.session.is_finished.then(|| response.session.clone());
        self.notify(&players, &ServerMessage::move_made(response));
        if let Some(session) = finished {
            self.announce("game_over", session);
        }
    }
}
