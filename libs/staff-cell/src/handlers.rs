use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateStaffRequest, StaffError, UpdateStaffRequest};
use crate::services::StaffService;

#[axum::debug_handler]
pub async fn list_staff(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = StaffService::new(&config);
    let staff = service.list_staff().await.map_err(map_staff_error)?;
    Ok(Json(json!(staff)))
}

#[axum::debug_handler]
pub async fn get_staff(
    State(config): State<Arc<AppConfig>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = StaffService::new(&config);
    let staff = service.get_staff(&user_id).await.map_err(map_staff_error)?;
    Ok(Json(json!(staff)))
}

#[axum::debug_handler]
pub async fn create_staff(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<Json<Value>, AppError> {
    let service = StaffService::new(&config);
    let staff = service.create_staff(request).await.map_err(map_staff_error)?;
    Ok(Json(json!({
        "message": "User added",
        "userID": staff.user_id,
        "staff": staff,
    })))
}

#[axum::debug_handler]
pub async fn update_staff(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateStaffRequest>,
) -> Result<Json<Value>, AppError> {
    let service = StaffService::new(&config);
    let staff = service.update_staff(id, request).await.map_err(map_staff_error)?;
    Ok(Json(json!({
        "message": "User updated",
        "staff": staff,
    })))
}

#[axum::debug_handler]
pub async fn delete_staff(
    State(config): State<Arc<AppConfig>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = StaffService::new(&config);
    service.delete_staff(id).await.map_err(map_staff_error)?;
    Ok(Json(json!({ "message": "User deleted" })))
}

fn map_staff_error(e: StaffError) -> AppError {
    match e {
        StaffError::NotFound => AppError::NotFound("User not found".to_string()),
        StaffError::MissingFields => AppError::BadRequest("Missing required fields".to_string()),
        StaffError::UsernameTaken(username) => {
            AppError::Conflict(format!("Username {} is already taken", username))
        }
        StaffError::StoreUnavailable(msg) => AppError::ExternalService(msg),
        StaffError::DatabaseError(msg) => AppError::Database(msg),
    }
}
