use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn followup_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_followups))
        .route("/add", post(handlers::create_followup))
        .route("/update/{record_id}", put(handlers::update_followup))
        .route("/delete/{record_id}", delete(handlers::delete_followup))
        .with_state(state)
}

pub fn reminder_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_reminders))
        .route("/add", post(handlers::create_reminder))
        .route("/update/{id}", put(handlers::update_reminder))
        .route("/delete/{id}", delete(handlers::delete_reminder))
        .with_state(state)
}
