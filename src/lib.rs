pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use handlers::{agent, auth as auth_handlers, chat, docs, health, metrics, quota, AppState};

pub fn create_app(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login))
        .route("/refresh", post(auth_handlers::refresh))
        .route("/profile", get(auth_handlers::profile));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/quota", get(quota::get_quota))
        .route("/azure/chat/completions", post(chat::chat_completion))
        .route("/agent/make-html", post(agent::make_html))
        .nest("/auth", auth_routes)
        .merge(docs::create_docs_router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
