use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use notification_cell::{HttpMailer, Mailer, OutboundEmail};
use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{CreateReminderRequest, Reminder, ReminderError, UpdateReminderRequest};

pub struct ReminderService {
    supabase: SupabaseClient,
    mailer: Arc<dyn Mailer>,
}

impl ReminderService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_mailer(config, Arc::new(HttpMailer::new(config)))
    }

    pub fn with_mailer(config: &AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            mailer,
        }
    }

    pub async fn list_reminders(&self) -> Result<Vec<Reminder>, ReminderError> {
        self.supabase
            .request(Method::GET, "/rest/v1/reminders?order=id.desc", None)
            .await
            .map_err(map_store_error)
    }

    /// Create a reminder and email it to the patient. Unlike the follow-up
    /// notice, the patient must exist and have an email on file before
    /// anything is written.
    pub async fn create_reminder(
        &self,
        request: CreateReminderRequest,
    ) -> Result<Reminder, ReminderError> {
        let patient_id = non_blank(&request.patient_id).ok_or(ReminderError::MissingFields)?;
        let message = non_blank(&request.message).ok_or(ReminderError::MissingFields)?;

        let path = format!(
            "/rest/v1/patients?patient_id=eq.{}&select=full_name,email",
            urlencoding::encode(patient_id)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(map_store_error)?;
        let patient = rows.into_iter().next().ok_or(ReminderError::UnknownPatient)?;

        let patient_name = patient
            .get("full_name")
            .and_then(Value::as_str)
            .unwrap_or("Patient")
            .to_string();
        let email = patient
            .get("email")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ReminderError::PatientMissingEmail)?
            .to_string();

        let full_name = non_blank(&request.full_name)
            .map(str::to_string)
            .unwrap_or_else(|| patient_name.clone());
        let status = non_blank(&request.status).unwrap_or("Pending").to_string();

        debug!("Creating reminder for patient {}", patient_id);

        let body = json!({
            "patient_id": patient_id,
            "full_name": full_name,
            "message": message,
            "status": status,
        });

        let rows: Vec<Reminder> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/reminders",
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        let reminder = rows
            .into_iter()
            .next()
            .ok_or_else(|| ReminderError::DatabaseError("insert returned no row".to_string()))?;

        info!("Reminder {} created for {}", reminder.id, reminder.patient_id);

        let mailer = Arc::clone(&self.mailer);
        let outbound = OutboundEmail::reminder(&email, &patient_name, &reminder.message, &reminder.status);
        let reminder_id = reminder.id;
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&outbound).await {
                warn!("Reminder {} email failed: {}", reminder_id, e);
            }
        });

        Ok(reminder)
    }

    pub async fn update_reminder(
        &self,
        id: i64,
        request: UpdateReminderRequest,
    ) -> Result<Reminder, ReminderError> {
        let mut update_data = serde_json::Map::new();
        if let Some(full_name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(message) = request.message {
            update_data.insert("message".to_string(), json!(message));
        }
        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }

        if update_data.is_empty() {
            return Err(ReminderError::MissingFields);
        }

        let path = format!("/rest/v1/reminders?id=eq.{}", id);
        let rows: Vec<Reminder> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        rows.into_iter().next().ok_or(ReminderError::NotFound)
    }

    pub async fn delete_reminder(&self, id: i64) -> Result<(), ReminderError> {
        let path = format!("/rest/v1/reminders?id=eq.{}", id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(representation_headers()))
            .await
            .map_err(map_store_error)?;

        if rows.is_empty() {
            return Err(ReminderError::NotFound);
        }
        info!("Reminder {} deleted", id);
        Ok(())
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

fn map_store_error(e: SupabaseError) -> ReminderError {
    if e.is_retryable() {
        ReminderError::StoreUnavailable(e.to_string())
    } else {
        ReminderError::DatabaseError(e.to_string())
    }
}
