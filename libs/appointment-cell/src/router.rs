use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/add", post(handlers::schedule_appointment))
        .route("/check-availability", post(handlers::check_availability))
        .route("/update/{id}", put(handlers::update_appointment))
        .route("/delete/{id}", delete(handlers::delete_appointment))
        .with_state(state)
}
