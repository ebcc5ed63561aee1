use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreatePatientRequest, PatientError, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn list_patients(State(config): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patients = service.list_patients().await.map_err(map_patient_error)?;
    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.get_patient(&patient_id).await.map_err(map_patient_error)?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service.create_patient(request).await.map_err(map_patient_error)?;
    Ok(Json(json!({
        "message": "Patient added successfully",
        "patientID": patient.patient_id,
        "patient": patient,
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service
        .update_patient(&patient_id, request)
        .await
        .map_err(map_patient_error)?;
    Ok(Json(json!({
        "message": "Patient updated successfully",
        "patient": patient,
    })))
}

#[axum::debug_handler]
pub async fn deactivate_patient(
    State(config): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&config);
    let patient = service
        .deactivate_patient(&patient_id)
        .await
        .map_err(map_patient_error)?;
    Ok(Json(json!({
        "message": "Patient deactivated successfully",
        "patient": patient,
    })))
}

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::MissingFields => AppError::BadRequest("Required fields missing".to_string()),
        PatientError::IdAlreadyExists(id) => {
            AppError::Conflict(format!("Patient ID {} already exists", id))
        }
        PatientError::StoreUnavailable(msg) => AppError::ExternalService(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}
