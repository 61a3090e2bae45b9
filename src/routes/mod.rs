//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Question bank
        .route(
            "/api/v1/questions",
            get(http::http_list_questions).post(http::http_create_question),
        )
        .route(
            "/api/v1/questions/:id",
            get(http::http_get_question)
                .put(http::http_update_question)
                .delete(http::http_delete_question),
        )
        // Word export + AI conversion
        .route("/api/v1/export", post(http::http_post_export))
        .route("/api/v1/convert", post(http::http_post_convert))
        .route("/api/v1/convert/single", post(http::http_post_convert_single))
        // Quizzes and results
        .route("/api/v1/quizzes", post(http::http_post_quiz))
        .route("/api/v1/quizzes/:id", get(http::http_get_quiz))
        .route("/api/v1/quizzes/:id/responses", post(http::http_post_response))
        .route("/api/v1/quizzes/:id/results", get(http::http_get_results))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
