use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{info, warn};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::ids::PlayerId;
use crate::models::messages::{ChessWebSocketMessage, ClientMessage, ServerMessage};
use crate::models::AppState;

/// WebSocket connection of one registered player
pub struct ChessWebSocket {
    pub id: String,
    pub player: PlayerId,
    pub app_state: web::Data<AppState>,
}

impl Actor for ChessWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.app_state
            .register_connection(&self.id, self.player, ctx.address());
        info!("WebSocket connection started: {} (player {})", self.id, self.player);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // Dropping the socket does not touch the player's game; an abandoned
        // game is reclaimed by the timeout sweep.
        self.app_state.remove_connection(&self.id);
        info!("WebSocket connection closed: {}", self.id);
        Running::Stop
    }
}

impl Handler<ChessWebSocketMessage> for ChessWebSocket {
    type Result = ();

    fn handle(&mut self, msg: ChessWebSocketMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChessWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    info!("Received {} from {}", client_msg.message_type, self.player);
                    self.handle_message(client_msg, ctx);
                }
                Err(e) => {
                    warn!("Error parsing client message: {}", e);
                    let mut reply = ServerMessage::new("error");
                    reply.error = Some(format!("Invalid message format: {}", e));
                    self.reply(&reply, ctx);
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                let mut reply = ServerMessage::new("error");
                reply.error = Some("Binary messages are not supported".to_string());
                self.reply(&reply, ctx);
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

impl ChessWebSocket {
    /// Send a frame to this connection only
    pub fn reply(&self, message: &ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match serde_json::to_string(message) {
            Ok(frame) => ctx.text(frame),
            Err(e) => {
                warn!("Failed to serialize {} reply: {}", message.message_type, e);
                ctx.text("{\"message_type\": \"error\", \"error\": \"Internal server error\"}");
            }
        }
    }
}

#[derive(Deserialize)]
pub struct WsParams {
    pub player_id: String,
}

/// WebSocket connection handler; the player must already be registered
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    params: web::Query<WsParams>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let player: PlayerId = params.player_id.parse()?;
    app_state.service.player(player)?;

    let id = Uuid::new_v4().to_string();
    info!("New WebSocket connection {} for player {}", id, player);

    let ws = ChessWebSocket {
        id,
        player,
        app_state: app_state.clone(),
    };
    ws::start(ws, &req, stream)
}
