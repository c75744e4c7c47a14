//! Matchmaking and game-session server for two-player chess.

pub mod config;
pub mod error;
pub mod game;
pub mod matchmaking;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod supervisor;
pub mod websocket;

pub use error::{GameError, GameResult};
pub use service::GameService;
