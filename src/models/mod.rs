pub mod app_state;
pub mod game_state;
pub mod ids;
pub mod messages;
pub mod player;

// Re-export important types
pub use app_state::AppState;
pub use game_state::*;
pub use ids::{PlayerId, SessionId};
pub use messages::*;
pub use player::{Player, PlayerResult, PlayerStats, PlayerView};
