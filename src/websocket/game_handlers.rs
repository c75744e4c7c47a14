use actix_web_actors::ws;
use log::{info, warn};

use crate::error::{GameError, GameResult};
use crate::models::ids::SessionId;
use crate::models::messages::{ClientMessage, QueueStatus, ServerMessage};
use crate::websocket::handler::ChessWebSocket;

impl ChessWebSocket {
    pub fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let outcome = match msg.message_type.as_str() {
            "join_queue" => self.handle_join_queue(ctx),
            "leave_queue" => self.handle_leave_queue(ctx),
            "status" => self.handle_status(&msg, ctx),
            "move" => self.handle_move(&msg),
            "forfeit" => self.handle_forfeit(&msg),
            "get_moves" => self.handle_get_moves(&msg, ctx),
            other => {
                warn!("Unknown message type: {}", other);
                let mut reply = ServerMessage::new("error");
                reply.error = Some(format!("Unknown message type: {}", other));
                self.reply(&reply, ctx);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            info!("Rejected {} from {}: {}", msg.message_type, self.player, e);
            self.reply(&ServerMessage::error(&e), ctx);
        }
    }

    fn handle_join_queue(&mut self, ctx: &mut ws::WebsocketContext<Self>) -> GameResult<()> {
        let status = self.app_state.service.join_queue(self.player)?;
        if let QueueStatus::GameStarted { game_id, .. } = &status {
            let started = self.app_state.service.session_status(self.player, *game_id)?;
            self.app_state.announce("game_started", started.view);
        }
        self.reply(&ServerMessage::queue(status), ctx);
        Ok(())
    }

    fn handle_leave_queue(&mut self, ctx: &mut ws::WebsocketContext<Self>) -> GameResult<()> {
        self.app_state.service.leave_queue(self.player)?;
        self.reply(&ServerMessage::new("queue_left"), ctx);
        Ok(())
    }

    /// Session snapshot when a game id is given, otherwise the queue status
    fn handle_status(
        &mut self,
        msg: &ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> GameResult<()> {
        let reply = match &msg.game_id {
            Some(game_id) => {
                let game_id: SessionId = game_id.parse()?;
                let status = self.app_state.service.session_status(self.player, game_id)?;
                self.app_state.announce_if_finished(&status);
                ServerMessage::session("game_state", status.view)
            }
            None => ServerMessage::queue(self.app_state.service.queue_status(self.player)?),
        };
        self.reply(&reply, ctx);
        Ok(())
    }

    fn handle_move(&mut self, msg: &ClientMessage) -> GameResult<()> {
        let game_id = required_game_id(msg)?;
        let from = msg.move_from.as_deref().ok_or(GameError::MissingField("move_from"))?;
        let to = msg.move_to.as_deref().ok_or(GameError::MissingField("move_to"))?;

        let response = self
            .app_state
            .service
            .submit_move(self.player, game_id, from, to)
            .map_err(|e| self.app_state.move_rejected(self.player, game_id, e))?;
        // The mover's own connections are among the recipients
        self.app_state.announce_move(response);
        Ok(())
    }

    fn handle_forfeit(&mut self, msg: &ClientMessage) -> GameResult<()> {
        let game_id = required_game_id(msg)?;
        let update = self.app_state.service.forfeit(self.player, game_id)?;
        self.app_state.announce_if_finished(&update);
        Ok(())
    }

    fn handle_get_moves(
        &mut self,
        msg: &ClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> GameResult<()> {
        let game_id = required_game_id(msg)?;
        let square = msg.move_from.as_deref().ok_or(GameError::MissingField("move_from"))?;
        let moves = self.app_state.service.available_moves(self.player, game_id, square)?;
        self.reply(&ServerMessage::available_moves(game_id, moves), ctx);
        Ok(())
    }
}

fn required_game_id(msg: &ClientMessage) -> GameResult<SessionId> {
    msg.game_id
        .as_deref()
        .ok_or(GameError::MissingField("game_id"))?
        .parse()
}
