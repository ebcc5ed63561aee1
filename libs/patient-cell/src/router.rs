use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn patient_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_patients))
        .route("/add", post(handlers::create_patient))
        .route("/{patient_id}", get(handlers::get_patient))
        .route("/update/{patient_id}", put(handlers::update_patient))
        .route("/deactivate/{patient_id}", put(handlers::deactivate_patient))
        .with_state(state)
}
