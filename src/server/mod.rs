pub mod routes;
pub mod ws;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

/// HTTP + WS surface. Unknown paths fall through to the static client bundle.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let index = static_dir.join("index.html");

    Router::new()
        .route("/", get(routes::home))
        .route("/simulate", post(routes::simulate))
        .route("/visualize", post(routes::visualize))
        .route("/pricing", post(routes::pricing))
        .route("/risk", post(routes::risk))
        .route("/api/latest", get(routes::latest))
        .route("/api/counters", get(routes::get_counters))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
