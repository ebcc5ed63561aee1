use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityRequest, AvailabilityResponse, ScheduleAppointmentRequest, SchedulingError,
    UpdateAppointmentRequest,
};
use crate::services::AppointmentSchedulingService;

#[axum::debug_handler]
pub async fn schedule_appointment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<ScheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentSchedulingService::from_config(&config);
    let appointment = service
        .schedule_appointment(&request)
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(json!({
        "message": "Appointment scheduled successfully",
        "appointmentID": appointment.id,
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn check_availability(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let service = AppointmentSchedulingService::from_config(&config);
    let available = service
        .check_availability(
            request.doctor_id.as_deref(),
            request.appointment_date.as_deref(),
        )
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(AvailabilityResponse { available }))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentSchedulingService::from_config(&config);
    let appointments = service
        .list_appointments()
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentSchedulingService::from_config(&config);
    let appointment = service
        .update_appointment(id, &request)
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": appointment,
    })))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentSchedulingService::from_config(&config);
    service
        .delete_appointment(id)
        .await
        .map_err(map_scheduling_error)?;
    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::SlotTaken => AppError::Conflict(e.to_string()),
        SchedulingError::UnknownAppointment => AppError::NotFound(e.to_string()),
        SchedulingError::ServiceUnavailable(msg) => AppError::ExternalService(msg),
        other => AppError::BadRequest(other.to_string()),
    }
}
