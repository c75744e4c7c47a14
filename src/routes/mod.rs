use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde_json::json;
use std::future::{ready, Ready};

use crate::error::GameError;
use crate::models::ids::{PlayerId, SessionId};
use crate::models::messages::{MoveRequest, QueueStatus, RegisterRequest};
use crate::models::player::PlayerView;
use crate::models::AppState;

pub const PLAYER_HEADER: &str = "X-Player-Id";

/// The calling player, taken from the `X-Player-Id` header
pub struct CurrentPlayer(pub PlayerId);

impl FromRequest for CurrentPlayer {
    type Error = GameError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let player = match req.headers().get(PLAYER_HEADER) {
            None => Err(GameError::MissingField(PLAYER_HEADER)),
            Some(value) => value
                .to_str()
                .map_err(|_| {
                    let raw = String::from_utf8_lossy(value.as_bytes()).into_owned();
                    GameError::InvalidPlayerId(raw)
                })
                .and_then(str::parse),
        };
        ready(player.map(CurrentPlayer))
    }
}

type Reply = Result<HttpResponse, GameError>;

async fn register_player(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> Reply {
    let player = state.service.register_player(&body.name)?;
    Ok(HttpResponse::Created().json(PlayerView::from(&player)))
}

async fn get_player(state: web::Data<AppState>, path: web::Path<String>) -> Reply {
    let id: PlayerId = path.parse()?;
    let player = state.service.player(id)?;
    Ok(HttpResponse::Ok().json(PlayerView::from(&player)))
}

async fn recent_games(state: web::Data<AppState>, path: web::Path<String>) -> Reply {
    let id: PlayerId = path.parse()?;
    Ok(HttpResponse::Ok().json(state.service.recent_games(id)?))
}

async fn join_queue(state: web::Data<AppState>, CurrentPlayer(player): CurrentPlayer) -> Reply {
    let status = state.service.join_queue(player)?;
    if let QueueStatus::GameStarted { game_id, .. } = &status {
        let started = state.service.session_status(player, *game_id)?;
        state.announce("game_started", started.view);
    }
    Ok(HttpResponse::Ok().json(status))
}

async fn leave_queue(state: web::Data<AppState>, CurrentPlayer(player): CurrentPlayer) -> Reply {
    state.service.leave_queue(player)?;
    Ok(HttpResponse::Ok().json(json!({ "status": "left" })))
}

async fn queue_status(state: web::Data<AppState>, CurrentPlayer(player): CurrentPlayer) -> Reply {
    Ok(HttpResponse::Ok().json(state.service.queue_status(player)?))
}

async fn game_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    CurrentPlayer(player): CurrentPlayer,
) -> Reply {
    let game_id: SessionId = path.parse()?;
    let status = state.service.session_status(player, game_id)?;
    state.announce_if_finished(&status);
    Ok(HttpResponse::Ok().json(status.view))
}

async fn submit_move(
    state: web::Data<AppState>,
    path: web::Path<String>,
    CurrentPlayer(player): CurrentPlayer,
    body: web::Json<MoveRequest>,
) -> Reply {
    let game_id: SessionId = path.parse()?;
    let response = state
        .service
        .submit_move(player, game_id, &body.from, &body.to)
        .map_err(|e| state.move_rejected(player, game_id, e))?;
    let reply = HttpResponse::Ok().json(&response);
    state.announce_move(response);
    Ok(reply)
}

async fn move_history(
    state: web::Data<AppState>,
    path: web::Path<String>,
    CurrentPlayer(player): CurrentPlayer,
) -> Reply {
    let game_id: SessionId = path.parse()?;
    Ok(HttpResponse::Ok().json(state.service.move_history(player, game_id)?))
}

async fn forfeit(
    state: web::Data<AppState>,
    path: web::Path<String>,
    CurrentPlayer(player): CurrentPlayer,
) -> Reply {
    let game_id: SessionId = path.parse()?;
    let update = state.service.forfeit(player, game_id)?;
    state.announce_if_finished(&update);
    Ok(HttpResponse::Ok().json(update.view))
}

async fn inactivity(
    state: web::Data<AppState>,
    path: web::Path<String>,
    CurrentPlayer(player): CurrentPlayer,
) -> Reply {
    let game_id: SessionId = path.parse()?;
    Ok(HttpResponse::Ok().json(state.service.inactivity(player, game_id)?))
}

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(crate::websocket::ws_index)))
        .service(
            web::scope("/api")
                .service(web::resource("/players").route(web::post().to(register_player)))
                .service(web::resource("/players/{id}").route(web::get().to(get_player)))
                .service(web::resource("/players/{id}/games").route(web::get().to(recent_games)))
                .service(
                    web::resource("/queue")
                        .route(web::post().to(join_queue))
                        .route(web::delete().to(leave_queue)),
                )
                .service(web::resource("/queue/status").route(web::get().to(queue_status)))
                .service(web::resource("/games/{id}").route(web::get().to(game_status)))
                .service(
                    web::resource("/games/{id}/moves")
                        .route(web::post().to(submit_move))
                        .route(web::get().to(move_history)),
                )
                .service(web::resource("/games/{id}/forfeit").route(web::post().to(forfeit)))
                .service(web::resource("/games/{id}/inactivity").route(web::get().to(inactivity))),
        );
}
