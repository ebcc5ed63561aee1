use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use notification_cell::{HttpMailer, Mailer, OutboundEmail};
use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::models::{parse_day, CreateFollowUpRequest, FollowUp, FollowUpError};

pub struct FollowUpService {
    supabase: SupabaseClient,
    mailer: Arc<dyn Mailer>,
}

impl FollowUpService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_mailer(config, Arc::new(HttpMailer::new(config)))
    }

    pub fn with_mailer(config: &AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            mailer,
        }
    }

    pub async fn list_followups(&self) -> Result<Vec<FollowUp>, FollowUpError> {
        self.supabase
            .request(
                Method::GET,
                "/rest/v1/followups?order=appointment_date.desc",
                None,
            )
            .await
            .map_err(map_store_error)
    }

    pub async fn create_followup(
        &self,
        request: CreateFollowUpRequest,
    ) -> Result<FollowUp, FollowUpError> {
        let patient_id = non_blank(&request.patient_id).ok_or(FollowUpError::MissingFields)?;
        let raw_date = non_blank(&request.appointment_date).ok_or(FollowUpError::MissingFields)?;
        let status = non_blank(&request.status).ok_or(FollowUpError::MissingFields)?;

        let appointment_date = parse_day(raw_date).ok_or(FollowUpError::InvalidDate)?;
        let next_visit_date = match non_blank(&request.next_visit_date) {
            Some(raw) => Some(parse_day(raw).ok_or(FollowUpError::InvalidDate)?),
            None => None,
        };

        debug!("Recording follow-up for patient {}", patient_id);

        let body = json!({
            "patient_id": patient_id,
            "fullname": request.fullname,
            "appointment_date": appointment_date,
            "next_visit_date": next_visit_date,
            "notes": request.notes,
            "status": status,
        });

        let rows: Vec<FollowUp> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/followups",
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        let followup = rows
            .into_iter()
            .next()
            .ok_or_else(|| FollowUpError::DatabaseError("insert returned no row".to_string()))?;

        info!("Follow-up {} recorded", followup.record_id);
        self.dispatch_notice(&followup);

        Ok(followup)
    }

    pub async fn update_followup(
        &self,
        record_id: i64,
        request: CreateFollowUpRequest,
    ) -> Result<FollowUp, FollowUpError> {
        let patient_id = non_blank(&request.patient_id).ok_or(FollowUpError::MissingFields)?;
        let raw_date = non_blank(&request.appointment_date).ok_or(FollowUpError::MissingFields)?;
        let status = non_blank(&request.status).ok_or(FollowUpError::MissingFields)?;

        let appointment_date = parse_day(raw_date).ok_or(FollowUpError::InvalidDate)?;
        let next_visit_date = match non_blank(&request.next_visit_date) {
            Some(raw) => Some(parse_day(raw).ok_or(FollowUpError::InvalidDate)?),
            None => None,
        };

        let body = json!({
            "patient_id": patient_id,
            "fullname": request.fullname,
            "appointment_date": appointment_date,
            "next_visit_date": next_visit_date,
            "notes": request.notes,
            "status": status,
        });

        let path = format!("/rest/v1/followups?record_id=eq.{}", record_id);
        let rows: Vec<FollowUp> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(representation_headers()))
            .await
            .map_err(map_store_error)?;

        rows.into_iter().next().ok_or(FollowUpError::NotFound)
    }

    pub async fn delete_followup(&self, record_id: i64) -> Result<(), FollowUpError> {
        let path = format!("/rest/v1/followups?record_id=eq.{}", record_id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(representation_headers()))
            .await
            .map_err(map_store_error)?;

        if rows.is_empty() {
            return Err(FollowUpError::NotFound);
        }
        info!("Follow-up {} deleted", record_id);
        Ok(())
    }

    /// Best-effort notice to the patient. The record is already committed;
    /// a missing patient, missing email, or mail failure only logs.
    fn dispatch_notice(&self, followup: &FollowUp) {
        let path = format!(
            "/rest/v1/patients?patient_id=eq.{}&select=full_name,email",
            urlencoding::encode(&followup.patient_id)
        );
        let record_id = followup.record_id;
        let fullname = followup.fullname.clone();
        let next_visit = followup.next_visit_date.map(|d| d.to_string());
        let mailer = Arc::clone(&self.mailer);
        let supabase = self.supabase.clone();

        // The email lookup runs inside the detached task so the response
        // never waits on it.
        tokio::spawn(async move {
            let rows = match supabase.request::<Vec<Value>>(Method::GET, &path, None).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Follow-up {} notice skipped, patient lookup failed: {}", record_id, e);
                    return;
                }
            };
            let Some(row) = rows.into_iter().next() else {
                debug!("Follow-up {} notice skipped, no patient row", record_id);
                return;
            };
            let email = row
                .get("email")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string);
            let Some(email) = email else {
                debug!("Follow-up {} notice skipped, patient has no email", record_id);
                return;
            };

            let name = fullname.as_deref().unwrap_or("Patient");
            let message = OutboundEmail::followup_recorded(&email, name, next_visit.as_deref());
            if let Err(e) = mailer.send(&message).await {
                warn!("Follow-up {} notice failed: {}", record_id, e);
            }
        });
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

fn map_store_error(e: SupabaseError) -> FollowUpError {
    if e.is_retryable() {
        FollowUpError::StoreUnavailable(e.to_string())
    } else {
        FollowUpError::DatabaseError(e.to_string())
    }
}
