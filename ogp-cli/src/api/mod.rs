//! HTTP surface of the backend.

mod error;
mod handlers;
#[cfg(test)]
mod tests;

pub use error::ApiError;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use ogp_core::validation::MAX_IMAGE_BYTES;
use ogp_core::GameRegistry;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Room for an icon, a cover and the JSON part.
const MAX_BODY_BYTES: usize = 2 * MAX_IMAGE_BYTES + 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
}

pub fn router(state: AppState, assets_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/ogp/me", get(handlers::platform_user))
        .route("/games", get(handlers::list_games))
        .route("/games/submit", post(handlers::submit_game))
        .route(
            "/games/:game_id",
            get(handlers::get_game)
                .put(handlers::update_game)
                .delete(handlers::delete_game),
        )
        .route("/games/:game_id/leaderboard", get(handlers::leaderboard))
        .route("/game-scores", post(handlers::record_score))
        .route("/users/:email", get(handlers::user));

    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api);

    if let Some(dir) = assets_dir {
        app = app.nest_service("/assets", ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
