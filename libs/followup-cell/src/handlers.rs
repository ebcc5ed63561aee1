use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    CreateFollowUpRequest, CreateReminderRequest, FollowUpError, ReminderError,
    UpdateReminderRequest,
};
use crate::services::{FollowUpService, ReminderService};

#[axum::debug_handler]
pub async fn list_followups(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = FollowUpService::new(&config);
    let followups = service.list_followups().await.map_err(map_followup_error)?;
    Ok(Json(json!(followups)))
}

#[axum::debug_handler]
pub async fn create_followup(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateFollowUpRequest>,
) -> Result<Json<Value>, AppError> {
    let service = FollowUpService::new(&config);
    let followup = service.create_followup(request).await.map_err(map_followup_error)?;
    Ok(Json(json!({
        "message": "Follow-up added successfully",
        "followup": followup,
    })))
}

#[axum::debug_handler]
pub async fn update_followup(
    State(config): State<Arc<AppConfig>>,
    Path(record_id): Path<i64>,
    Json(request): Json<CreateFollowUpRequest>,
) -> Result<Json<Value>, AppError> {
    let service = FollowUpService::new(&config);
    let followup = service
        .update_followup(record_id, request)
        .await
        .map_err(map_followup_error)?;
    Ok(Json(json!({
        "message": "Follow-up updated successfully",
        "followup": followup,
    })))
}

#[axum::debug_handler]
pub async fn delete_followup(
    State(config): State<Arc<AppConfig>>,
    Path(record_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = FollowUpService::new(&config);
    service.delete_followup(record_id).await.map_err(map_followup_error)?;
    Ok(Json(json!({ "message": "Follow-up deleted successfully" })))
}

#[axum::debug_handler]
pub async fn list_reminders(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);
    let reminders = service.list_reminders().await.map_err(map_reminder_error)?;
    Ok(Json(json!(reminders)))
}

#[axum::debug_handler]
pub async fn create_reminder(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);
    let reminder = service.create_reminder(request).await.map_err(map_reminder_error)?;
    Ok(Json(json!({
        "message": "Reminder added successfully",
        "reminder": reminder,
    })))
}

#[axum::debug_handler]
pub async fn update_reminder(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateReminderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);
    let reminder = service
        .update_reminder(id, request)
        .await
        .map_err(map_reminder_error)?;
    Ok(Json(json!({
        "message": "Reminder updated",
        "reminder": reminder,
    })))
}

#[axum::debug_handler]
pub async fn delete_reminder(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = ReminderService::new(&config);
    service.delete_reminder(id).await.map_err(map_reminder_error)?;
    Ok(Json(json!({ "message": "Reminder deleted" })))
}

fn map_followup_error(e: FollowUpError) -> AppError {
    match e {
        FollowUpError::NotFound => AppError::NotFound(e.to_string()),
        FollowUpError::MissingFields | FollowUpError::InvalidDate => {
            AppError::BadRequest(e.to_string())
        }
        FollowUpError::StoreUnavailable(msg) => AppError::ExternalService(msg),
        FollowUpError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn map_reminder_error(e: ReminderError) -> AppError {
    match e {
        ReminderError::NotFound => AppError::NotFound(e.to_string()),
        ReminderError::MissingFields
        | ReminderError::UnknownPatient
        | ReminderError::PatientMissingEmail => AppError::BadRequest(e.to_string()),
        ReminderError::StoreUnavailable(msg) => AppError::ExternalService(msg),
        ReminderError::DatabaseError(msg) => AppError::Database(msg),
    }
}
