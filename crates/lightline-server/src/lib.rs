pub mod api;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod health;
pub mod room_manager;
pub mod state;
pub mod ws;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let api_routes = Router::new()
        .route("/rooms", get(api::list_rooms))
        .route("/rooms/{room}", get(api::get_room))
        .route("/rooms/{room}/pause", post(api::pause_room))
        .route("/rooms/{room}/resume", post(api::resume_room))
        .route("/rooms/{room}/stop", post(api::stop_room));

    let app = Router::new()
        .route("/ws/{room}", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}
