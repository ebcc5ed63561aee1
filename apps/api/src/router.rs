use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use followup_cell::router::{followup_routes, reminder_routes};
use patient_cell::router::patient_routes;
use staff_cell::router::staff_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Patient Follow-up API is running!" }))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/users", staff_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/followups", followup_routes(state.clone()))
        .nest("/reminders", reminder_routes(state.clone()))
}
