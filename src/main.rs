use actix_web::{web, App, HttpServer};
use log::{error, info};
use std::sync::Arc;

use chess_match_server::config::ServerConfig;
use chess_match_server::models::AppState;
use chess_match_server::routes::configure_routes;
use chess_match_server::service::GameService;
use chess_match_server::store::{MemoryGameStore, MemoryPlayerStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    let service = GameService::new(
        Arc::new(MemoryPlayerStore::new()),
        Arc::new(MemoryGameStore::new()),
        config.timeout_policy(),
    );
    let supervisor = service.timeout_supervisor();
    let app_state = web::Data::new(AppState::new(service));

    let notifier = app_state.clone();
    actix_rt::spawn(supervisor.run(move |session| {
        notifier.announce("game_over", session.view());
    }));

    info!("Starting chess match server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}
