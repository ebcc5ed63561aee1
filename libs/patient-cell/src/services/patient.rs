use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{CreatePatientRequest, Patient, PatientError, PatientStatus, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, PatientError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/patients?order=full_name.asc", None)
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Patient>, _>>()
            .map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    pub async fn get_patient(&self, patient_id: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!(
            "/rest/v1/patients?patient_id=eq.{}",
            urlencoding::encode(patient_id)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(map_store_error)?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PatientError::DatabaseError(e.to_string()))
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        if request.full_name.trim().is_empty()
            || request.phone.trim().is_empty()
            || request.email.trim().is_empty()
        {
            return Err(PatientError::MissingFields);
        }

        // Registration form leaves the ID read-only; generate one when absent.
        let patient_id = match request.patient_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => format!("P{}", Utc::now().timestamp_millis()),
        };

        debug!("Creating patient {}", patient_id);

        let patient_data = json!({
            "patient_id": patient_id,
            "full_name": request.full_name,
            "age": request.age,
            "gender": request.gender,
            "phone": request.phone,
            "email": request.email,
            "notes": request.notes,
            "status": request.status.unwrap_or(PatientStatus::Active),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::POST, "/rest/v1/patients", Some(patient_data), Some(headers))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    PatientError::IdAlreadyExists(patient_id.clone())
                } else {
                    map_store_error(e)
                }
            })?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("insert returned no row".to_string()))?;
        let patient: Patient =
            serde_json::from_value(row).map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        info!("Patient {} registered", patient.patient_id);
        Ok(patient)
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let mut update_data = serde_json::Map::new();
        if let Some(full_name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(age) = request.age {
            update_data.insert("age".to_string(), json!(age));
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }

        if update_data.is_empty() {
            return Err(PatientError::MissingFields);
        }

        self.patch_patient(patient_id, Value::Object(update_data)).await
    }

    /// Soft delete: the row stays, only the status flips.
    pub async fn deactivate_patient(&self, patient_id: &str) -> Result<Patient, PatientError> {
        debug!("Deactivating patient {}", patient_id);
        let patient = self
            .patch_patient(patient_id, json!({ "status": PatientStatus::Inactive }))
            .await?;
        info!("Patient {} deactivated", patient.patient_id);
        Ok(patient)
    }

    async fn patch_patient(&self, patient_id: &str, body: Value) -> Result<Patient, PatientError> {
        let path = format!(
            "/rest/v1/patients?patient_id=eq.{}",
            urlencoding::encode(patient_id)
        );
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(headers))
            .await
            .map_err(map_store_error)?;

        let row = result.into_iter().next().ok_or(PatientError::NotFound)?;
        serde_json::from_value(row).map_err(|e| PatientError::DatabaseError(e.to_string()))
    }
}

fn map_store_error(e: SupabaseError) -> PatientError {
    if e.is_retryable() {
        PatientError::StoreUnavailable(e.to_string())
    } else {
        PatientError::DatabaseError(e.to_string())
    }
}
