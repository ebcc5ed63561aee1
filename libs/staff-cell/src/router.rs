use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn staff_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_staff))
        .route("/add", post(handlers::create_staff))
        .route("/{user_id}", get(handlers::get_staff))
        .route("/update/{id}", put(handlers::update_staff))
        .route("/delete/{id}", delete(handlers::delete_staff))
        .with_state(state)
}
