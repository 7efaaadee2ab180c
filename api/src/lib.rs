pub mod chat_payload;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod text_response;
pub mod youtube_payload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub use config::AppConfig;
pub use state::AppState;

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/upload_pdf", post(handlers::upload_pdf))
        .route("/process_youtube", post(handlers::process_youtube))
        .route("/chat", post(handlers::chat))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
