use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod ai;
pub mod auth;
pub mod categories;
pub mod categorizer;
pub mod client;
pub mod config;
pub mod constants;
pub mod database;
pub mod models;
pub mod projections;
pub mod state;
pub mod statement_parser;
pub mod stats;
pub mod transactions;
pub mod upload;
pub mod utils;

use state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me).put(auth::update_me))
        .route("/api/auth/password", post(auth::change_password))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/api/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route("/api/transactions/summary", get(transactions::get_summary))
        .route(
            "/api/transactions/{id}",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .patch(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/api/stats/monthly", get(stats::get_monthly_stats))
        .route("/api/stats/by-category", get(stats::get_stats_by_category))
        .route(
            "/api/projections",
            get(projections::list_projections).post(projections::create_projection),
        )
        .route(
            "/api/projections/{id}",
            get(projections::get_projection)
                .put(projections::update_projection)
                .delete(projections::delete_projection),
        )
        .route(
            "/api/projections/from-month/{year}/{month}",
            post(projections::create_projection_from_month),
        )
        .route(
            "/api/projections/{id}/compare",
            get(projections::compare_projection),
        )
        .route("/api/upload/statement", post(upload::upload_statement))
        .route(
            "/api/upload/statement/{id}",
            delete(upload::delete_statement),
        )
        .route(
            "/api/upload/statement/{id}/confirm",
            post(upload::confirm_statement),
        )
        .route("/api/upload/statements", get(upload::list_statements))
        .route("/api/ai/chat", post(ai::chat))
        .route("/api/ai/chat/history", get(ai::chat_history))
        .route("/api/ai/analyze", post(ai::analyze))
        .route("/api/ai/status", get(ai::status))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Finance Dashboard API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
