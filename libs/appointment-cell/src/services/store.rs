use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{Appointment, AppointmentChanges, NewAppointment, PatientRecord, StaffRecord};

/// Failures surfaced by a [`DirectoryStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The unique (doctor, timestamp) index rejected an insert.
    #[error("slot already booked")]
    DuplicateSlot,

    #[error("record not found")]
    NotFound,

    /// Transient transport, timeout, or upstream API failures.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something we could not decode.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl From<SupabaseError> for StoreError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Decode(e) => StoreError::Malformed(e.to_string()),
            e if e.is_conflict() => StoreError::DuplicateSlot,
            e => StoreError::Unavailable(e.to_string()),
        }
    }
}

/// Persistence seam for the scheduler: patient and staff lookups plus the
/// appointment table itself. Implementations must enforce a unique
/// (doctor_id, appointment_date) constraint on insert.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StoreError>;

    async fn find_staff(&self, user_id: &str) -> Result<Option<StaffRecord>, StoreError>;

    /// Whether any appointment occupies the exact (doctor, timestamp) slot,
    /// optionally ignoring one appointment id (for reschedules).
    async fn appointment_exists(
        &self,
        doctor_id: &str,
        at: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<bool, StoreError>;

    /// Insert a booking. Returns [`StoreError::DuplicateSlot`] when the
    /// unique index rejects it. Never retried.
    async fn insert_appointment(&self, record: &NewAppointment) -> Result<Appointment, StoreError>;

    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError>;

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError>;

    async fn update_appointment(
        &self,
        id: i64,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError>;

    async fn delete_appointment(&self, id: i64) -> Result<(), StoreError>;
}

/// [`DirectoryStore`] backed by Supabase's PostgREST API.
pub struct SupabaseDirectoryStore {
    supabase: SupabaseClient,
}

/// Canonical timestamp encoding used in filter params and insert payloads.
/// Sub-second precision is dropped so equality filters always match what
/// was written.
fn canonical_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl SupabaseDirectoryStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Idempotent read with a single retry on transient failures. Writes
    /// never go through this path.
    async fn read<T>(&self, path: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        match self.supabase.request(Method::GET, path, None).await {
            Err(e) if e.is_retryable() => {
                debug!("Retrying read after transient failure: {}", e);
                self.supabase
                    .request(Method::GET, path, None)
                    .await
                    .map_err(StoreError::from)
            }
            other => other.map_err(StoreError::from),
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[async_trait]
impl DirectoryStore for SupabaseDirectoryStore {
    async fn find_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, StoreError> {
        let path = format!(
            "/rest/v1/patients?patient_id=eq.{}&select=patient_id,full_name,email",
            urlencoding::encode(patient_id)
        );
        let rows: Vec<PatientRecord> = self.read(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_staff(&self, user_id: &str) -> Result<Option<StaffRecord>, StoreError> {
        let path = format!(
            "/rest/v1/users?user_id=eq.{}&select=user_id,username,role",
            urlencoding::encode(user_id)
        );
        let rows: Vec<StaffRecord> = self.read(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn appointment_exists(
        &self,
        doctor_id: &str,
        at: DateTime<Utc>,
        exclude: Option<i64>,
    ) -> Result<bool, StoreError> {
        let mut path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&select=id",
            urlencoding::encode(doctor_id),
            urlencoding::encode(&canonical_timestamp(at))
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }

        let rows: Vec<serde_json::Value> = self.read(&path).await?;
        Ok(!rows.is_empty())
    }

    async fn insert_appointment(&self, record: &NewAppointment) -> Result<Appointment, StoreError> {
        let body = json!({
            "patient_id": record.patient_id,
            "patient_name": record.patient_name,
            "doctor_id": record.doctor_id,
            "doctor_username": record.doctor_username,
            "appointment_date": canonical_timestamp(record.appointment_date),
            "purpose": record.purpose,
            "status": record.status,
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(body),
                Some(Self::representation_headers()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no row".to_string()))
    }

    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Appointment> = self.read(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        self.read("/rest/v1/appointments?order=appointment_date.desc")
            .await
    }

    async fn update_appointment(
        &self,
        id: i64,
        changes: &AppointmentChanges,
    ) -> Result<Appointment, StoreError> {
        let mut body = serde_json::Map::new();
        if let Some(at) = changes.appointment_date {
            body.insert("appointment_date".into(), json!(canonical_timestamp(at)));
        }
        if let Some(ref doctor_id) = changes.doctor_id {
            body.insert("doctor_id".into(), json!(doctor_id));
        }
        if let Some(ref doctor_username) = changes.doctor_username {
            body.insert("doctor_username".into(), json!(doctor_username));
        }
        if let Some(ref purpose) = changes.purpose {
            body.insert("purpose".into(), json!(purpose));
        }
        if let Some(ref status) = changes.status {
            body.insert("status".into(), json!(status));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(serde_json::Value::Object(body)),
                Some(Self::representation_headers()),
            )
            .await?;

        rows.into_iter().next().ok_or(StoreError::NotFound)
    }

    async fn delete_appointment(&self, id: i64) -> Result<(), StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<serde_json::Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(Self::representation_headers()),
            )
            .await?;

        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
